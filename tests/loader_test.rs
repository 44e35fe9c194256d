use wayflow::compiler::loader;
use wayflow::compiler::validator::validate;
use wayflow::dsl::builder::DefinitionBuilder;
use wayflow::dsl::samples;
use wayflow::EngineConfig;
use std::fs;
use std::path::Path;

fn demo(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[test]
fn test_load_simple_yaml_definition() {
    let yaml_content = r#"
id: "test-yaml-flow"
name: "YAML Test Flow"
nodes:
  - id: "start"
    type: "Start"
  - id: "approve"
    name: "Approve"
    type: "UserTask"
    candidate_groups: ["managers"]
  - id: "decide"
    type: "ExclusiveGateway"
  - id: "end"
    type: "End"
edges:
  - source: "start"
    target: "approve"
  - source: "approve"
    target: "decide"
  - source: "decide"
    target: "approve"
    label: "rejected"
    guard: "${pass=='2'}"
  - source: "decide"
    target: "end"
"#;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("test_definition.yaml");
    fs::write(&file_path, yaml_content).expect("Failed to write temp file");

    let loaded = loader::load_definition_from_yaml(&file_path)
        .expect("Failed to load definition from YAML");

    let expected = DefinitionBuilder::new("test-yaml-flow")
        .name("YAML Test Flow")
        .start("start")
        .user_task("approve", "Approve", ["managers"])
        .gateway("decide")
        .end("end")
        .connect("start", "approve")
        .connect("approve", "decide")
        .connect_if("decide", "approve", "rejected", "${pass=='2'}")
        .connect("decide", "end")
        .build();

    assert_eq!(loaded, expected);

    temp_dir.close().expect("Failed to close temp dir");
}

#[test]
fn test_load_missing_file_reports_path() {
    let err = loader::load_definition_from_yaml("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn test_load_invalid_yaml_fails() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("broken.yaml");
    fs::write(&file_path, "id: x\nnodes:\n  - id: a\n    type: Teleport\n").unwrap();

    assert!(loader::load_definition_from_yaml(&file_path).is_err());
}

#[test]
fn test_demo_definitions_are_valid() {
    let review = loader::load_definition_from_yaml(demo("simple_review.yaml")).unwrap();
    assert_eq!(review, samples::simple_review());
    assert!(validate(&review).is_empty());

    let claim = loader::load_definition_from_yaml(demo("expense_claim.yaml")).unwrap();
    assert_eq!(claim.id, "expense-claim");
    assert!(validate(&claim).is_empty());
}

#[test]
fn test_load_engine_config() {
    let config = EngineConfig::from_yaml_file(demo("config.yaml")).unwrap();
    assert_eq!(config.max_auto_steps, 1000);
    assert!(!config.require_gateway_default);
    assert_eq!(config.users["alice"], vec!["candidateGroup1".to_string(), "leads".to_string()]);
}

#[test]
fn test_partial_config_uses_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("config.yaml");
    fs::write(&file_path, "require_gateway_default: true\n").unwrap();

    let config = EngineConfig::from_yaml_file(&file_path).unwrap();
    assert!(config.require_gateway_default);
    assert_eq!(config.max_auto_steps, EngineConfig::default().max_auto_steps);
    assert!(config.users.is_empty());
}
