pub mod core;
pub mod loader;
pub mod validator;

pub use validator::{validate, ValidationError, Validator};
