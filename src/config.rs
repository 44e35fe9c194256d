use std::collections::HashMap;
use std::fs;
use std::path::Path;
use anyhow::{Result, Context as AnyhowContext};
use serde::{Serialize, Deserialize};

/// Engine settings, usually read from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Require exactly one unguarded edge on every exclusive gateway instead
    /// of at most one.
    pub require_gateway_default: bool,
    /// Upper bound on automatic transitions taken within one `start` or
    /// `complete` call.
    pub max_auto_steps: usize,
    /// Static user -> candidate groups table for the built-in identity
    /// provider.
    pub users: HashMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_gateway_default: false,
            max_auto_steps: 10_000,
            users: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {}", file_path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", file_path.display()))
    }
}
