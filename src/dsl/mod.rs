pub mod builder;
pub mod samples;

use serde::{Serialize, Deserialize};

/// 流程定义 (Process Definition)
///
/// Authoring-side model of a process graph. Once handed to the deployment
/// store it is frozen behind an `Arc` and never mutated again; the store
/// stamps the assigned `version` on the way in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Definition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Definition {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges of `id`, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }
}

/// 节点类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NodeKind {
    Start,
    UserTask {
        #[serde(default)]
        candidate_groups: Vec<String>,
    },
    ExclusiveGateway,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// 连线 (Sequence Flow)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Absent guard means the edge is unconditional.
    #[serde(default)]
    pub guard: Option<String>,
}

impl Edge {
    pub fn is_default(&self) -> bool {
        self.guard.as_deref().is_none_or(|g| g.trim().is_empty())
    }
}
