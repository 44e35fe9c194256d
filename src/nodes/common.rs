use crate::nodes::flow::Transitions;
use crate::nodes::guard::Variables;
use crate::runtime::node::{Node, NodeError};
use crate::runtime::syscall::Syscall;

#[derive(Debug)]
pub struct StartNode {
    transitions: Transitions,
}

impl StartNode {
    pub fn new(transitions: Transitions) -> Self {
        Self { transitions }
    }
}

impl Node for StartNode {
    fn execute(&self, vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        syscall.jump(self.transitions.select(vars)?);
        Ok(())
    }
}

#[derive(Debug)]
pub struct EndNode;

impl Node for EndNode {
    fn execute(&self, _vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        syscall.terminate();
        Ok(())
    }
}
