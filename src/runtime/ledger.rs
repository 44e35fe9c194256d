//! Task ledger: pending human tasks and the operations that act on them.
//!
//! Completion is deliberately not idempotent. The first `complete` removes
//! the task under the instance lock; any later or concurrent call for the
//! same id finds nothing and gets `TaskNotFound`.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::info;
use uuid::Uuid;
use crate::error::{EngineError, EngineResult};
use crate::nodes::guard::Variables;
use crate::runtime::engine::{Engine, Entry};
use crate::runtime::instance::{Instance, Token};

/// 待办任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub token_id: Uuid,
    pub node_id: String,
    pub name: String,
    pub candidate_groups: Vec<String>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingTask {
    pub fn new(token: &Token, name: &str, candidate_groups: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id: token.instance_id,
            token_id: token.id,
            node_id: token.node_id.clone(),
            name: name.to_string(),
            candidate_groups,
            assignee: None,
            created_at: Utc::now(),
        }
    }

    /// Tasks without candidate groups are open to everyone.
    pub fn is_candidate(&self, groups: &[String]) -> bool {
        self.candidate_groups.is_empty()
            || self.candidate_groups.iter().any(|g| groups.contains(g))
    }
}

impl Engine {
    /// Snapshot of the instance's pending tasks, oldest first. Taken under
    /// the instance lock, so it never falls between a completion and the
    /// task that follows it.
    pub async fn list_pending(&self, instance_id: Uuid) -> EngineResult<Vec<PendingTask>> {
        self.locked(instance_id, async {
            if self.instances.load(instance_id).await?.is_none() {
                return Err(EngineError::InstanceNotFound(instance_id));
            }
            Ok(self.tasks.list_by_instance(instance_id).await?)
        })
        .await
    }

    /// Pending tasks, across all instances, offered to `group`. Not tied to
    /// any instance lock: a task appears once it is stored and disappears
    /// as soon as its completion starts.
    pub async fn list_pending_for_group(&self, group: &str) -> EngineResult<Vec<PendingTask>> {
        Ok(self.tasks.list_by_group(group).await?)
    }

    /// Assigns the task to `user_id` if the identity provider places the
    /// user in one of the task's candidate groups. Claiming again as the
    /// same user is a no-op.
    pub async fn claim(&self, task_id: Uuid, user_id: &str) -> EngineResult<PendingTask> {
        let instance_id = self.tasks.get(task_id).await?
            .ok_or(EngineError::TaskNotFound(task_id))?
            .instance_id;

        self.locked(instance_id, self.claim_locked(task_id, instance_id, user_id)).await
    }

    async fn claim_locked(&self, task_id: Uuid, instance_id: Uuid, user_id: &str) -> EngineResult<PendingTask> {
        let mut task = self.tasks.get(task_id).await?
            .ok_or(EngineError::TaskNotFound(task_id))?;

        match task.assignee.as_deref() {
            Some(current) if current == user_id => return Ok(task),
            Some(current) => {
                return Err(EngineError::AlreadyClaimed {
                    task_id,
                    assignee: current.to_string(),
                });
            }
            None => {}
        }

        let groups = self.identity.groups_of(user_id).await?;
        if !task.is_candidate(&groups) {
            return Err(EngineError::NotCandidate {
                task_id,
                user_id: user_id.to_string(),
            });
        }

        task.assignee = Some(user_id.to_string());
        self.tasks.update(task.clone()).await?;
        info!(task_id = %task_id, instance_id = %instance_id, user_id, "Task claimed");
        Ok(task)
    }

    /// Completes a pending task: merges `variables` into the instance
    /// (last write wins), removes the task and resumes its token.
    pub async fn complete(&self, task_id: Uuid, variables: Variables) -> EngineResult<Instance> {
        let instance_id = self.tasks.get(task_id).await?
            .ok_or(EngineError::TaskNotFound(task_id))?
            .instance_id;

        self.locked(instance_id, self.complete_locked(task_id, instance_id, variables)).await
    }

    async fn complete_locked(&self, task_id: Uuid, instance_id: Uuid, variables: Variables) -> EngineResult<Instance> {
        // Re-check under the lock: a racing completion may have won.
        let task = self.tasks.get(task_id).await?
            .ok_or(EngineError::TaskNotFound(task_id))?;

        let mut instance = self.instance(instance_id).await?;
        if !instance.is_running() {
            return Err(EngineError::InstanceNotRunning { instance_id, status: instance.status });
        }
        let token_pos = instance.token_position(task.token_id)
            .ok_or(EngineError::TaskNotFound(task_id))?;
        let (deployment, nodes) = self.deployment_of(&instance).await?;

        if self.tasks.remove(task_id).await?.is_none() {
            return Err(EngineError::TaskNotFound(task_id));
        }
        info!(task_id = %task_id, instance_id = %instance_id, node_id = %task.node_id, "Task completed");

        instance.merge_variables(variables);
        let advanced = self.advance(&mut instance, token_pos, &deployment, &nodes, Entry::Resume);
        self.settle(instance, advanced).await
    }
}
