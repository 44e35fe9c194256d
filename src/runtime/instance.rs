use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use crate::nodes::guard::Variables;
use crate::runtime::blueprint::{BlueprintKind, BlueprintNode, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Running,
    Completed,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
    AtStart,
    AtUserTask,
    AtGateway,
    AtEnd,
}

impl TokenState {
    fn of(kind: &BlueprintKind) -> Self {
        match kind {
            BlueprintKind::Start => TokenState::AtStart,
            BlueprintKind::UserTask { .. } => TokenState::AtUserTask,
            BlueprintKind::ExclusiveGateway => TokenState::AtGateway,
            BlueprintKind::End => TokenState::AtEnd,
        }
    }
}

/// 执行令牌：一个实例中的一条控制线程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub node_id: String,
    pub node_index: NodeIndex,
    pub state: TokenState,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn new(instance_id: Uuid, index: NodeIndex, node: &BlueprintNode) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            node_id: node.id.clone(),
            node_index: index,
            state: TokenState::of(&node.kind),
            created_at: Utc::now(),
        }
    }

    /// Moves the token in one step: id, index and state change together.
    pub fn move_to(&mut self, index: NodeIndex, node: &BlueprintNode) {
        self.node_id = node.id.clone();
        self.node_index = index;
        self.state = TokenState::of(&node.kind);
    }
}

/// 流程实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub definition_id: String,
    pub definition_version: u32,
    pub variables: Variables,
    pub tokens: Vec<Token>,
    pub status: InstanceStatus,
    /// Why the instance was terminated, if it was.
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Instance {
    pub fn new(definition_id: &str, definition_version: u32, variables: Variables) -> Self {
        Self {
            id: Uuid::new_v4(),
            definition_id: definition_id.to_string(),
            definition_version,
            variables,
            tokens: Vec::new(),
            status: InstanceStatus::Running,
            failure: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }

    /// Last write wins on key collision.
    pub fn merge_variables(&mut self, variables: Variables) {
        self.variables.extend(variables);
    }

    pub fn token_position(&self, token_id: Uuid) -> Option<usize> {
        self.tokens.iter().position(|t| t.id == token_id)
    }

    pub fn all_tokens_ended(&self) -> bool {
        self.tokens.iter().all(|t| t.state == TokenState::AtEnd)
    }

    pub(crate) fn mark_completed(&mut self) {
        self.status = InstanceStatus::Completed;
        self.ended_at = Some(Utc::now());
    }

    pub(crate) fn mark_terminated(&mut self, reason: String) {
        self.status = InstanceStatus::Terminated;
        self.failure = Some(reason);
        self.ended_at = Some(Utc::now());
    }
}
