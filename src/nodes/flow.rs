use crate::nodes::guard::{Guard, Variables};
use crate::runtime::blueprint::{NodeIndex, Transition};
use crate::runtime::node::{Node, NodeError};
use crate::runtime::syscall::Syscall;
use crate::nodes::guard::EvaluationError;

// --- TRANSITIONS ---

#[derive(Debug)]
struct GuardedBranch {
    guard: Guard, // Pre-compiled AST
    target: NodeIndex,
}

/// Outgoing edges of a node, ready for selection.
///
/// Guarded branches are tried in declaration order and the first one that
/// holds wins; the guard-less edge is only taken when none of them does.
#[derive(Debug)]
pub struct Transitions {
    branches: Vec<GuardedBranch>,
    default_next: Option<NodeIndex>,
}

impl Transitions {
    pub fn compile(outgoing: &[Transition]) -> Result<Self, EvaluationError> {
        let mut branches = Vec::new();
        let mut default_next = None;
        for t in outgoing {
            match t.guard.as_deref().filter(|g| !g.trim().is_empty()) {
                Some(raw) => branches.push(GuardedBranch {
                    guard: Guard::parse(raw)?,
                    target: t.target,
                }),
                None => {
                    if default_next.is_none() {
                        default_next = Some(t.target);
                    }
                }
            }
        }
        Ok(Self { branches, default_next })
    }

    pub fn select(&self, vars: &Variables) -> Result<NodeIndex, NodeError> {
        for branch in &self.branches {
            if branch.guard.evaluate(vars)? {
                return Ok(branch.target);
            }
        }
        self.default_next.ok_or(NodeError::NoMatchingTransition)
    }
}

// --- EXCLUSIVE GATEWAY ---

#[derive(Debug)]
pub struct GatewayNode {
    transitions: Transitions,
}

impl GatewayNode {
    pub fn new(transitions: Transitions) -> Self {
        Self { transitions }
    }
}

impl Node for GatewayNode {
    fn execute(&self, vars: &Variables, syscall: &mut dyn Syscall) -> Result<(), NodeError> {
        let target = self.transitions.select(vars)?;
        syscall.jump(target);
        Ok(())
    }
}
