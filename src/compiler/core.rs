use std::collections::HashMap;
use crate::compiler::validator::ValidationError;
use crate::dsl::{Definition, Edge, Node, NodeKind};
use crate::runtime::blueprint::{Blueprint, BlueprintKind, BlueprintNode, NodeIndex, Transition};

/// Lowers a definition into an index-based [`Blueprint`].
///
/// Expects a definition that already passed validation; it only re-reports
/// the defects that make lowering impossible.
pub struct Compiler {
    id_map: HashMap<String, NodeIndex>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            id_map: HashMap::new(),
        }
    }

    pub fn compile(&mut self, definition: &Definition) -> Result<Blueprint, ValidationError> {
        self.id_map.clear();

        // 1. Pass 1: Indexing
        for (idx, node) in definition.nodes.iter().enumerate() {
            if self.id_map.insert(node.id.clone(), idx).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        // 2. Pass 2: Transform
        let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
        for edge in &definition.edges {
            adjacency.entry(edge.source.as_str()).or_default().push(edge);
        }

        let mut nodes = Vec::with_capacity(definition.nodes.len());
        for node in &definition.nodes {
            let edges = adjacency.get(node.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            nodes.push(self.transform_node(node, edges)?);
        }

        // 3. Start Node
        let start_index = definition.nodes.iter()
            .position(|n| matches!(n.kind, NodeKind::Start))
            .ok_or(ValidationError::MissingStart)?;

        Ok(Blueprint {
            id: definition.id.clone(),
            name: definition.name.clone(),
            nodes,
            start_index,
        })
    }

    fn transform_node(&self, node: &Node, edges: &[&Edge]) -> Result<BlueprintNode, ValidationError> {
        let kind = match &node.kind {
            NodeKind::Start => BlueprintKind::Start,
            NodeKind::UserTask { candidate_groups } => BlueprintKind::UserTask {
                candidate_groups: candidate_groups.clone(),
            },
            NodeKind::ExclusiveGateway => BlueprintKind::ExclusiveGateway,
            NodeKind::End => BlueprintKind::End,
        };

        let outgoing = edges.iter()
            .map(|e| {
                Ok(Transition {
                    target: self.resolve_target(e)?,
                    label: e.label.clone(),
                    guard: e.guard.clone().filter(|g| !g.trim().is_empty()),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(BlueprintNode {
            id: node.id.clone(),
            name: node.name.clone(),
            kind,
            outgoing,
        })
    }

    fn resolve_target(&self, edge: &Edge) -> Result<NodeIndex, ValidationError> {
        self.id_map.get(&edge.target)
            .copied()
            .ok_or_else(|| ValidationError::UnknownEndpoint {
                from: edge.source.clone(),
                to: edge.target.clone(),
                missing: edge.target.clone(),
            })
    }
}
