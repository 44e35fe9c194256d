pub mod blueprint;
pub mod deployment;
pub mod engine;
pub mod identity;
pub mod instance;
pub mod ledger;
pub mod node;
pub mod storage;
pub mod syscall;

pub use crate::nodes::guard::Variables;
pub use engine::Engine;
pub use instance::{Instance, InstanceStatus, Token, TokenState};
pub use ledger::PendingTask;
