use wayflow::compiler::loader;
use wayflow::dsl::samples;
use wayflow::runtime::identity::StaticIdentityProvider;
use wayflow::runtime::storage::{InMemoryDefinitionRepository, InMemoryInstanceStore, InMemoryTaskStore};
use wayflow::runtime::{Engine, InstanceStatus, Variables};
use wayflow::{EngineConfig, EngineError};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn engine_with_users() -> Engine {
    let identity = StaticIdentityProvider::default()
        .with_user("alice", ["candidateGroup1"])
        .with_user("bob", ["candidateGroup1", "candidateGroup2"])
        .with_user("mallory", ["outsiders"]);

    Engine::new_with_storage(
        EngineConfig::default(),
        Arc::new(InMemoryDefinitionRepository::new()),
        Arc::new(InMemoryInstanceStore::new()),
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(identity),
    )
}

#[tokio::test]
async fn test_claim_checks_candidate_groups() {
    let engine = engine_with_users();
    engine.deploy(samples::simple_review()).await.unwrap();
    let instance = engine.start("process02", None, Variables::new()).await.unwrap();
    let task = engine.list_pending(instance.id).await.unwrap().remove(0);

    let err = engine.claim(task.id, "mallory").await.unwrap_err();
    assert!(matches!(err, EngineError::NotCandidate { ref user_id, .. } if user_id == "mallory"));

    let err = engine.claim(task.id, "nobody").await.unwrap_err();
    assert!(matches!(err, EngineError::NotCandidate { .. }));

    let claimed = engine.claim(task.id, "alice").await.expect("Claim failed");
    assert_eq!(claimed.assignee.as_deref(), Some("alice"));

    // Claiming again as the same user changes nothing.
    let again = engine.claim(task.id, "alice").await.unwrap();
    assert_eq!(again, claimed);

    let err = engine.claim(task.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClaimed { ref assignee, .. } if assignee == "alice"));

    let pending = engine.list_pending(instance.id).await.unwrap();
    assert_eq!(pending[0].assignee.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_claimed_task_can_still_be_completed() {
    let engine = engine_with_users();
    engine.deploy(samples::simple_review()).await.unwrap();
    let instance = engine.start("process02", None, Variables::new()).await.unwrap();
    let task = engine.list_pending(instance.id).await.unwrap().remove(0);

    engine.claim(task.id, "bob").await.unwrap();
    let done = engine
        .complete(task.id, Variables::from([("pass".to_string(), json!("2"))]))
        .await
        .unwrap();
    assert_eq!(done.status, InstanceStatus::Completed);

    let err = engine.claim(task.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(_)));
}

#[tokio::test]
async fn test_list_pending_for_group() {
    let engine = engine_with_users();
    engine.deploy(samples::simple_review()).await.unwrap();

    let first = engine.start("process02", None, Variables::new()).await.unwrap();
    let second = engine.start("process02", None, Variables::new()).await.unwrap();

    let inbox = engine.list_pending_for_group("candidateGroup1").await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().any(|t| t.instance_id == first.id));
    assert!(inbox.iter().any(|t| t.instance_id == second.id));
    assert!(engine.list_pending_for_group("candidateGroup2").await.unwrap().is_empty());

    // Moving the first instance to the sign-off shifts its task to the other group.
    let task = engine.list_pending(first.id).await.unwrap().remove(0);
    engine
        .complete(task.id, Variables::from([("pass".to_string(), json!("1"))]))
        .await
        .unwrap();

    let reviewers = engine.list_pending_for_group("candidateGroup1").await.unwrap();
    assert_eq!(reviewers.len(), 1);
    assert_eq!(reviewers[0].instance_id, second.id);

    let signers = engine.list_pending_for_group("candidateGroup2").await.unwrap();
    assert_eq!(signers.len(), 1);
    assert_eq!(signers[0].node_id, "task2");
}

#[tokio::test]
async fn test_users_from_config() {
    let config = EngineConfig::from_yaml_file(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("config.yaml"),
    )
    .unwrap();
    let engine = Engine::with_config(config);
    engine.deploy(samples::approval_chain()).await.unwrap();
    let instance = engine.start("process01", None, Variables::new()).await.unwrap();
    let task = engine.list_pending(instance.id).await.unwrap().remove(0);

    assert!(matches!(
        engine.claim(task.id, "bob").await.unwrap_err(),
        EngineError::NotCandidate { .. }
    ));
    assert!(engine.claim(task.id, "alice").await.is_ok());
}

#[tokio::test]
async fn test_expense_claim_routes_by_amount() {
    let definition = loader::load_definition_from_yaml(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("expense_claim.yaml"),
    )
    .unwrap();

    let engine = Engine::new();
    engine.deploy(definition).await.unwrap();

    // Small and approved: done after the lead.
    let small = engine
        .start("expense-claim", None, Variables::from([("amount".to_string(), json!(40))]))
        .await
        .unwrap();
    let lead = engine.list_pending(small.id).await.unwrap().remove(0);
    assert_eq!(lead.node_id, "lead_review");
    assert_eq!(lead.candidate_groups, vec!["leads".to_string()]);
    let done = engine
        .complete(lead.id, Variables::from([("approved".to_string(), json!(true))]))
        .await
        .unwrap();
    assert_eq!(done.status, InstanceStatus::Completed);

    // Large: falls through to the default edge and waits for finance.
    let large = engine
        .start("expense-claim", None, Variables::from([("amount".to_string(), json!(2500))]))
        .await
        .unwrap();
    let lead = engine.list_pending(large.id).await.unwrap().remove(0);
    let routed = engine
        .complete(lead.id, Variables::from([("approved".to_string(), json!(true))]))
        .await
        .unwrap();
    assert_eq!(routed.status, InstanceStatus::Running);
    assert_eq!(routed.tokens[0].node_id, "finance_review");

    let finance = engine.list_pending_for_group("finance").await.unwrap();
    assert_eq!(finance.len(), 1);
    let done = engine.complete(finance[0].id, Variables::new()).await.unwrap();
    assert_eq!(done.status, InstanceStatus::Completed);

    let all = engine.list_instances().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|i| i.status == InstanceStatus::Completed));
}
