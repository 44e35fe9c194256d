use std::fmt::Debug;
use thiserror::Error;
use crate::nodes::guard::{EvaluationError, Variables};
use crate::runtime::syscall::Syscall;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("no outgoing transition matched")]
    NoMatchingTransition,
    #[error("node is not waiting for a signal")]
    NotWaiting,
}

/// 运行时节点接口
pub trait Node: Send + Sync + Debug {
    /// Called when a token arrives at the node.
    fn execute(&self, vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError>;

    /// Called when a parked token is released by an external completion.
    fn signal(&self, _vars: &Variables, _syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        Err(NodeError::NotWaiting)
    }
}
