pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod nodes;
pub mod runtime;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
