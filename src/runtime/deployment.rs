use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use crate::compiler::core::Compiler;
use crate::compiler::validator::Validator;
use crate::dsl::Definition;
use crate::error::{EngineError, EngineResult};
use crate::runtime::blueprint::Blueprint;
use crate::runtime::storage::DefinitionRepository;

/// 已部署的流程定义 (immutable)
#[derive(Debug)]
pub struct Deployment {
    pub deployment_id: Uuid,
    pub definition: Definition,
    pub blueprint: Blueprint,
    pub deployed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    pub deployment_id: Uuid,
    pub definition_id: String,
    pub name: String,
    pub version: u32,
    pub deployed_at: DateTime<Utc>,
}

impl From<&Deployment> for DeploymentSummary {
    fn from(d: &Deployment) -> Self {
        Self {
            deployment_id: d.deployment_id,
            definition_id: d.definition.id.clone(),
            name: d.definition.name.clone(),
            version: d.definition.version,
            deployed_at: d.deployed_at,
        }
    }
}

/// Validates, compiles and versions definitions before handing them to the
/// repository. A definition with any validation error is never stored.
pub struct DeploymentStore {
    validator: Validator,
    repository: Arc<dyn DefinitionRepository>,
}

impl DeploymentStore {
    pub fn new(validator: Validator, repository: Arc<dyn DefinitionRepository>) -> Self {
        Self { validator, repository }
    }

    pub async fn deploy(&self, definition: Definition) -> EngineResult<DeploymentSummary> {
        let errors = self.validator.validate(&definition);
        if !errors.is_empty() {
            warn!(definition_id = %definition.id, errors = errors.len(), "Deployment refused");
            return Err(EngineError::ValidationFailed(errors));
        }

        let blueprint = Compiler::new()
            .compile(&definition)
            .map_err(|e| EngineError::ValidationFailed(vec![e]))?;

        let deployment = self.repository.append(definition, blueprint).await?;
        info!(
            definition_id = %deployment.definition.id,
            version = deployment.definition.version,
            deployment_id = %deployment.deployment_id,
            "Definition deployed"
        );
        Ok(DeploymentSummary::from(deployment.as_ref()))
    }

    pub async fn get(&self, id: &str, version: u32) -> EngineResult<Arc<Deployment>> {
        self.repository.get(id, version).await?
            .ok_or_else(|| EngineError::NotFound { id: id.to_string(), version: Some(version) })
    }

    pub async fn latest(&self, id: &str) -> EngineResult<Arc<Deployment>> {
        self.repository.latest(id).await?
            .ok_or_else(|| EngineError::NotFound { id: id.to_string(), version: None })
    }

    /// `None` picks the latest version.
    pub async fn resolve(&self, id: &str, version: Option<u32>) -> EngineResult<Arc<Deployment>> {
        match version {
            Some(v) => self.get(id, v).await,
            None => self.latest(id).await,
        }
    }

    pub async fn list(&self) -> EngineResult<Vec<DeploymentSummary>> {
        let all = self.repository.list().await?;
        Ok(all.iter().map(|d| DeploymentSummary::from(d.as_ref())).collect())
    }
}
