use thiserror::Error;
use uuid::Uuid;
use crate::compiler::validator::ValidationError;
use crate::nodes::guard::EvaluationError;
use crate::runtime::instance::InstanceStatus;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("definition rejected with {} validation error(s)", .0.len())]
    ValidationFailed(Vec<ValidationError>),

    #[error("definition '{id}' (version {}) not found", .version.map_or_else(|| "latest".to_string(), |v| v.to_string()))]
    NotFound { id: String, version: Option<u32> },

    #[error("deployment {deployment_id} could not be prepared: {source}")]
    Prepare {
        deployment_id: Uuid,
        #[source]
        source: EvaluationError,
    },

    #[error("instance {0} not found")]
    InstanceNotFound(Uuid),

    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    #[error("instance {instance_id} failed at '{node_id}': {source}")]
    Evaluation {
        instance_id: Uuid,
        node_id: String,
        #[source]
        source: EvaluationError,
    },

    #[error("instance {instance_id} has no matching transition out of '{node_id}'")]
    NoMatchingTransition { instance_id: Uuid, node_id: String },

    #[error("instance {instance_id} exceeded {limit} automatic steps")]
    StepLimitExceeded { instance_id: Uuid, limit: usize },

    #[error("instance {instance_id} is {status:?}")]
    InstanceNotRunning { instance_id: Uuid, status: InstanceStatus },

    #[error("user '{user_id}' is not a candidate for task {task_id}")]
    NotCandidate { task_id: Uuid, user_id: String },

    #[error("task {task_id} is already claimed by '{assignee}'")]
    AlreadyClaimed { task_id: Uuid, assignee: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Whether the error ended the instance it was raised for.
    pub fn is_fatal_to_instance(&self) -> bool {
        matches!(
            self,
            EngineError::Evaluation { .. }
                | EngineError::NoMatchingTransition { .. }
                | EngineError::StepLimitExceeded { .. }
        )
    }
}
