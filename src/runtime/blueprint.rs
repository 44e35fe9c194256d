use serde::{Serialize, Deserialize};

pub type NodeIndex = usize;

/// 编译后的蓝图 (中间表示，可序列化)
///
/// Index-based view of a validated definition. Node order follows the
/// definition; each node's `outgoing` keeps edge declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub nodes: Vec<BlueprintNode>,
    pub start_index: NodeIndex,
}

impl Blueprint {
    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.id == node_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintNode {
    pub id: String,
    pub name: String,
    pub kind: BlueprintKind,
    pub outgoing: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlueprintKind {
    Start,
    UserTask { candidate_groups: Vec<String> },
    ExclusiveGateway,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub target: NodeIndex,
    pub label: Option<String>,
    pub guard: Option<String>,
}
