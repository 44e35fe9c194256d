use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use crate::config::EngineConfig;
use crate::dsl::{Definition, Edge, NodeKind};
use crate::nodes::guard::Guard;

/// 结构校验错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("definition id is empty")]
    EmptyDefinitionId,
    #[error("node at position {0} has an empty id")]
    EmptyNodeId(usize),
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),
    #[error("definition has no start node")]
    MissingStart,
    #[error("definition has more than one start node: {0:?}")]
    MultipleStarts(Vec<String>),
    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    UnknownEndpoint { from: String, to: String, missing: String },
    #[error("node '{0}' is not reachable from the start node")]
    Unreachable(String),
    #[error("node '{0}' has no outgoing edge")]
    DeadEnd(String),
    #[error("node '{0}' has no path to an end node")]
    NoPathToEnd(String),
    #[error("end node '{0}' has outgoing edges")]
    EndWithOutgoing(String),
    #[error("start node '{node}' must have exactly one unconditional outgoing edge, found {count} edge(s)")]
    StartTransition { node: String, count: usize },
    #[error("gateway '{node}' needs at least 2 outgoing edges, found {count}")]
    GatewayOutDegree { node: String, count: usize },
    #[error("gateway '{0}' has no default (unguarded) outgoing edge")]
    MissingDefault(String),
    #[error("node '{node}' has {count} unguarded outgoing edges, at most one is allowed")]
    MultipleDefaults { node: String, count: usize },
    #[error("edge {from} -> {to} has a malformed guard: {reason}")]
    MalformedGuard { from: String, to: String, reason: String },
}

/// Collects every structural defect of a definition instead of stopping at
/// the first one.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    require_gateway_default: bool,
}

impl Validator {
    pub fn new(require_gateway_default: bool) -> Self {
        Self { require_gateway_default }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.require_gateway_default)
    }

    pub fn validate(&self, definition: &Definition) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if definition.id.trim().is_empty() {
            errors.push(ValidationError::EmptyDefinitionId);
        }

        // 1. Node identity
        let mut kinds: HashMap<&str, &NodeKind> = HashMap::new();
        for (pos, node) in definition.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                errors.push(ValidationError::EmptyNodeId(pos));
                continue;
            }
            if kinds.insert(node.id.as_str(), &node.kind).is_some() {
                errors.push(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        let starts: Vec<String> = definition.nodes.iter()
            .filter(|n| matches!(n.kind, NodeKind::Start))
            .map(|n| n.id.clone())
            .collect();
        match starts.len() {
            0 => errors.push(ValidationError::MissingStart),
            1 => {}
            _ => errors.push(ValidationError::MultipleStarts(starts.clone())),
        }

        // 2. Edges
        let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &definition.edges {
            let mut resolved = true;
            for endpoint in [&edge.source, &edge.target] {
                if !kinds.contains_key(endpoint.as_str()) {
                    errors.push(ValidationError::UnknownEndpoint {
                        from: edge.source.clone(),
                        to: edge.target.clone(),
                        missing: endpoint.clone(),
                    });
                    resolved = false;
                }
            }
            if let Some(raw) = edge.guard.as_deref().filter(|g| !g.trim().is_empty()) {
                if let Err(e) = Guard::parse(raw) {
                    errors.push(ValidationError::MalformedGuard {
                        from: edge.source.clone(),
                        to: edge.target.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            if resolved {
                adjacency.entry(edge.source.as_str()).or_default().push(edge);
                reverse.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
            }
        }

        // 3. Per-node out-degree rules
        for node in definition.nodes.iter().filter(|n| !n.id.trim().is_empty()) {
            let out = adjacency.get(node.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let defaults = out.iter().filter(|e| e.is_default()).count();

            match node.kind {
                NodeKind::End => {
                    if !out.is_empty() {
                        errors.push(ValidationError::EndWithOutgoing(node.id.clone()));
                    }
                    continue;
                }
                NodeKind::Start => {
                    if out.len() != 1 || defaults != 1 {
                        errors.push(ValidationError::StartTransition {
                            node: node.id.clone(),
                            count: out.len(),
                        });
                    }
                }
                NodeKind::ExclusiveGateway => {
                    if out.len() < 2 {
                        errors.push(ValidationError::GatewayOutDegree {
                            node: node.id.clone(),
                            count: out.len(),
                        });
                    }
                    if defaults == 0 && self.require_gateway_default {
                        errors.push(ValidationError::MissingDefault(node.id.clone()));
                    }
                }
                NodeKind::UserTask { .. } => {}
            }

            if out.is_empty() {
                errors.push(ValidationError::DeadEnd(node.id.clone()));
            }
            if defaults > 1 {
                errors.push(ValidationError::MultipleDefaults {
                    node: node.id.clone(),
                    count: defaults,
                });
            }
        }

        // 4. Reachability from the start node
        if let [start] = starts.as_slice() {
            let forward: HashMap<&str, Vec<&str>> = adjacency.iter()
                .map(|(k, v)| (*k, v.iter().map(|e| e.target.as_str()).collect()))
                .collect();
            let seen = reach(std::iter::once(start.as_str()), &forward);
            for node in &definition.nodes {
                if !node.id.trim().is_empty() && !seen.contains(node.id.as_str()) {
                    errors.push(ValidationError::Unreachable(node.id.clone()));
                }
            }
        }

        // 5. Every non-end node must be able to finish
        let ends = definition.nodes.iter()
            .filter(|n| matches!(n.kind, NodeKind::End))
            .map(|n| n.id.as_str());
        let finishing = reach(ends, &reverse);
        for node in &definition.nodes {
            if node.id.trim().is_empty() || matches!(node.kind, NodeKind::End) {
                continue;
            }
            if !finishing.contains(node.id.as_str()) {
                errors.push(ValidationError::NoPathToEnd(node.id.clone()));
            }
        }

        errors
    }
}

/// Validates with the default (lenient gateway default) rules.
pub fn validate(definition: &Definition) -> Vec<ValidationError> {
    Validator::default().validate(definition)
}

fn reach<'a>(
    roots: impl Iterator<Item = &'a str>,
    graph: &HashMap<&'a str, Vec<&'a str>>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for root in roots {
        if seen.insert(root) {
            queue.push_back(root);
        }
    }
    while let Some(current) = queue.pop_front() {
        for next in graph.get(current).into_iter().flatten() {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    seen
}
