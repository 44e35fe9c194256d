use crate::nodes::flow::Transitions;
use crate::nodes::guard::Variables;
use crate::runtime::node::{Node, NodeError};
use crate::runtime::syscall::Syscall;

/// 人工任务节点
///
/// Parks the token on arrival. The engine turns the parked token into a
/// pending task; completing that task signals the node, which then picks
/// its outgoing transition against the merged variables.
#[derive(Debug)]
pub struct UserTaskNode {
    transitions: Transitions,
}

impl UserTaskNode {
    pub fn new(transitions: Transitions) -> Self {
        Self { transitions }
    }
}

impl Node for UserTaskNode {
    fn execute(&self, _vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        syscall.wait();
        Ok(())
    }

    fn signal(&self, vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        syscall.jump(self.transitions.select(vars)?);
        Ok(())
    }
}
