pub mod common;
pub mod flow;
pub mod guard;
pub mod task;

use crate::nodes::common::{EndNode, StartNode};
use crate::nodes::flow::{GatewayNode, Transitions};
use crate::nodes::guard::EvaluationError;
use crate::nodes::task::UserTaskNode;
use crate::runtime::blueprint::{BlueprintKind, BlueprintNode};
use crate::runtime::node::Node;

/// Instantiates the executable node for a blueprint entry, compiling its
/// outgoing guards.
pub fn prepare(bp_node: &BlueprintNode) -> Result<Box<dyn Node>, EvaluationError> {
    let node: Box<dyn Node> = match &bp_node.kind {
        BlueprintKind::Start => Box::new(StartNode::new(Transitions::compile(&bp_node.outgoing)?)),
        BlueprintKind::UserTask { .. } => {
            Box::new(UserTaskNode::new(Transitions::compile(&bp_node.outgoing)?))
        }
        BlueprintKind::ExclusiveGateway => {
            Box::new(GatewayNode::new(Transitions::compile(&bp_node.outgoing)?))
        }
        BlueprintKind::End => Box::new(EndNode),
    };
    Ok(node)
}
