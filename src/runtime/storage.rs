use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use crate::dsl::Definition;
use crate::runtime::blueprint::Blueprint;
use crate::runtime::deployment::Deployment;
use crate::runtime::instance::Instance;
use crate::runtime::ledger::PendingTask;

// --- Interfaces ---

/// Append-only store of deployed definitions.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Stores the next version of `definition.id` and returns the record.
    /// Version assignment must be atomic per definition id.
    async fn append(&self, definition: Definition, blueprint: Blueprint) -> Result<Arc<Deployment>>;
    async fn get(&self, id: &str, version: u32) -> Result<Option<Arc<Deployment>>>;
    async fn latest(&self, id: &str) -> Result<Option<Arc<Deployment>>>;
    async fn list(&self) -> Result<Vec<Arc<Deployment>>>;
}

#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert or overwrite.
    async fn save(&self, instance: &Instance) -> Result<()>;
    async fn load(&self, instance_id: Uuid) -> Result<Option<Instance>>;
    async fn list(&self) -> Result<Vec<Instance>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: PendingTask) -> Result<()>;
    async fn get(&self, task_id: Uuid) -> Result<Option<PendingTask>>;
    async fn update(&self, task: PendingTask) -> Result<()>;
    async fn remove(&self, task_id: Uuid) -> Result<Option<PendingTask>>;
    async fn list_by_instance(&self, instance_id: Uuid) -> Result<Vec<PendingTask>>;
    async fn list_by_group(&self, group: &str) -> Result<Vec<PendingTask>>;
    async fn remove_by_instance(&self, instance_id: Uuid) -> Result<Vec<PendingTask>>;
}

// --- In-Memory Implementations ---

#[derive(Default)]
pub struct InMemoryDefinitionRepository {
    // Map<DefinitionID, Versions in deploy order>
    definitions: DashMap<String, Vec<Arc<Deployment>>>,
}

impl InMemoryDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryDefinitionRepository {
    async fn append(&self, mut definition: Definition, blueprint: Blueprint) -> Result<Arc<Deployment>> {
        // The entry guard serializes concurrent deploys of the same id.
        let mut versions = self.definitions.entry(definition.id.clone()).or_default();
        definition.version = versions.len() as u32 + 1;
        let deployment = Arc::new(Deployment {
            deployment_id: Uuid::new_v4(),
            definition,
            blueprint,
            deployed_at: Utc::now(),
        });
        versions.push(deployment.clone());
        Ok(deployment)
    }

    async fn get(&self, id: &str, version: u32) -> Result<Option<Arc<Deployment>>> {
        Ok(self.definitions.get(id).and_then(|versions| {
            versions.iter().find(|d| d.definition.version == version).cloned()
        }))
    }

    async fn latest(&self, id: &str) -> Result<Option<Arc<Deployment>>> {
        Ok(self.definitions.get(id).and_then(|versions| versions.last().cloned()))
    }

    async fn list(&self) -> Result<Vec<Arc<Deployment>>> {
        let mut all: Vec<Arc<Deployment>> = self.definitions.iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| {
            a.definition.id.cmp(&b.definition.id)
                .then(a.definition.version.cmp(&b.definition.version))
        });
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryInstanceStore {
    instances: DashMap<Uuid, Instance>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn save(&self, instance: &Instance) -> Result<()> {
        self.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn load(&self, instance_id: Uuid) -> Result<Option<Instance>> {
        Ok(self.instances.get(&instance_id).map(|i| i.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Instance>> {
        let mut all: Vec<Instance> = self.instances.iter().map(|i| i.value().clone()).collect();
        all.sort_by_key(|i| i.created_at);
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<Uuid, PendingTask>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, filter: impl Fn(&PendingTask) -> bool) -> Vec<PendingTask> {
        let mut found: Vec<PendingTask> = self.tasks.iter()
            .filter(|t| filter(t.value()))
            .map(|t| t.value().clone())
            .collect();
        found.sort_by_key(|t| t.created_at);
        found
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: PendingTask) -> Result<()> {
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<PendingTask>> {
        Ok(self.tasks.get(&task_id).map(|t| t.value().clone()))
    }

    async fn update(&self, task: PendingTask) -> Result<()> {
        match self.tasks.get_mut(&task.id) {
            Some(mut existing) => {
                *existing = task;
                Ok(())
            }
            None => Err(anyhow::anyhow!("Task {} not found", task.id)),
        }
    }

    async fn remove(&self, task_id: Uuid) -> Result<Option<PendingTask>> {
        Ok(self.tasks.remove(&task_id).map(|(_, t)| t))
    }

    async fn list_by_instance(&self, instance_id: Uuid) -> Result<Vec<PendingTask>> {
        Ok(self.collect(|t| t.instance_id == instance_id))
    }

    async fn list_by_group(&self, group: &str) -> Result<Vec<PendingTask>> {
        Ok(self.collect(|t| t.candidate_groups.iter().any(|g| g == group)))
    }

    async fn remove_by_instance(&self, instance_id: Uuid) -> Result<Vec<PendingTask>> {
        let ids: Vec<Uuid> = self.tasks.iter()
            .filter(|t| t.instance_id == instance_id)
            .map(|t| *t.key())
            .collect();
        Ok(ids.into_iter().filter_map(|id| self.tasks.remove(&id).map(|(_, t)| t)).collect())
    }
}
