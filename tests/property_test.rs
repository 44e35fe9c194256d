//! Property tests: validation never lets a broken graph through, and gateway
//! routing depends only on edge declaration order.

use proptest::prelude::*;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use wayflow::compiler::validator::validate;
use wayflow::dsl::builder::DefinitionBuilder;
use wayflow::dsl::{Definition, NodeKind};
use wayflow::runtime::{Engine, Variables};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Mutation {
    None,
    DropEdge(usize),
    AddEdge(usize, usize),
    SecondStart,
    Orphan,
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        Just(Mutation::None),
        any::<usize>().prop_map(Mutation::DropEdge),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Mutation::AddEdge(a, b)),
        Just(Mutation::SecondStart),
        Just(Mutation::Orphan),
    ]
}

/// A chain of review tasks. Some tasks are followed by a gateway that can
/// send the token back to an earlier task.
fn review_chain(loops: &[(bool, usize)]) -> Definition {
    let len = loops.len();
    let next = |i: usize| if i + 1 < len { format!("t{}", i + 1) } else { "end".to_string() };

    let mut builder = DefinitionBuilder::new("chain").start("start").end("end");
    for i in 0..len {
        builder = builder.user_task(&format!("t{i}"), &format!("Task {i}"), ["g"]);
    }
    builder = builder.connect("start", "t0");

    for (i, &(has_loop, back)) in loops.iter().enumerate() {
        let task = format!("t{i}");
        if has_loop && i > 0 {
            let gateway = format!("g{i}");
            builder = builder
                .gateway(&gateway)
                .connect(&task, &gateway)
                .connect_if(&gateway, &format!("t{}", back % i), "rejected", "${pass=='2'}")
                .connect(&gateway, &next(i));
        } else {
            builder = builder.connect(&task, &next(i));
        }
    }
    builder.build()
}

fn apply(mut definition: Definition, mutation: &Mutation) -> Definition {
    match *mutation {
        Mutation::None => {}
        Mutation::DropEdge(i) => {
            let i = i % definition.edges.len();
            definition.edges.remove(i);
        }
        Mutation::AddEdge(a, b) => {
            let from = definition.nodes[a % definition.nodes.len()].id.clone();
            let to = definition.nodes[b % definition.nodes.len()].id.clone();
            let extra = DefinitionBuilder::new("").connect(&from, &to).build();
            definition.edges.extend(extra.edges);
        }
        Mutation::SecondStart => {
            let extra = DefinitionBuilder::new("")
                .start("start2")
                .connect("start2", "t0")
                .build();
            definition.nodes.extend(extra.nodes);
            definition.edges.extend(extra.edges);
        }
        Mutation::Orphan => {
            let extra = DefinitionBuilder::new("")
                .user_task("orphan", "Orphan", ["g"])
                .connect("orphan", "end")
                .build();
            definition.nodes.extend(extra.nodes);
            definition.edges.extend(extra.edges);
        }
    }
    definition
}

/// Graph check written against the raw definition, without the validator.
fn structurally_sound(definition: &Definition) -> bool {
    let starts = definition.nodes.iter()
        .filter(|n| matches!(n.kind, NodeKind::Start))
        .count();
    if starts != 1 {
        return false;
    }

    let ids: HashSet<&str> = definition.nodes.iter().map(|n| n.id.as_str()).collect();
    if definition.edges.iter().any(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str())) {
        return false;
    }

    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for e in &definition.edges {
        incoming.entry(e.target.as_str()).or_default().push(e.source.as_str());
    }

    let mut reaches_end: HashSet<&str> = definition.nodes.iter()
        .filter(|n| matches!(n.kind, NodeKind::End))
        .map(|n| n.id.as_str())
        .collect();
    let mut queue: VecDeque<&str> = reaches_end.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        for &pred in incoming.get(id).into_iter().flatten() {
            if reaches_end.insert(pred) {
                queue.push_back(pred);
            }
        }
    }

    definition.nodes.iter().all(|n| reaches_end.contains(n.id.as_str()))
}

fn routing_definition() -> Definition {
    DefinitionBuilder::new("routing")
        .start("start")
        .user_task("task", "Task", ["g"])
        .gateway("gw")
        .user_task("a", "A", ["g"])
        .user_task("b", "B", ["g"])
        .end("end")
        .connect("start", "task")
        .connect("task", "gw")
        .connect_if("gw", "a", "", "pass == '2'")
        .connect_if("gw", "b", "", "pass != '3'")
        .connect("a", "end")
        .connect("b", "end")
        .build()
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Unmodified chains are always accepted.
    #[test]
    fn well_formed_chains_validate_clean(
        loops in prop::collection::vec((any::<bool>(), any::<usize>()), 1..8),
    ) {
        let definition = review_chain(&loops);
        let errors = validate(&definition);
        prop_assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    /// Whatever the validator accepts has one start and a way out from every node.
    #[test]
    fn accepted_definitions_are_sound(
        loops in prop::collection::vec((any::<bool>(), any::<usize>()), 1..8),
        mutation in arb_mutation(),
    ) {
        let definition = apply(review_chain(&loops), &mutation);
        if validate(&definition).is_empty() {
            prop_assert!(structurally_sound(&definition), "accepted unsound graph: {:?}", mutation);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Node declaration order never changes which gateway edge is taken.
    #[test]
    fn gateway_choice_ignores_node_order(
        nodes in Just(routing_definition().nodes).prop_shuffle(),
        pass in prop_oneof![Just("1"), Just("2")],
    ) {
        let mut definition = routing_definition();
        definition.nodes = nodes;

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let engine = Engine::new();
            engine.deploy(definition).await.unwrap();

            let instance = engine.start("routing", None, Variables::new()).await.unwrap();
            let task = engine.list_pending(instance.id).await.unwrap().remove(0);
            let vars = Variables::from([("pass".to_string(), json!(pass))]);
            let advanced = engine.complete(task.id, vars).await.unwrap();

            // Both guards hold for "2"; the first declared edge wins.
            let expected = if pass == "2" { "a" } else { "b" };
            prop_assert_eq!(advanced.tokens[0].node_id.as_str(), expected);
            Ok(())
        })?;
    }
}
