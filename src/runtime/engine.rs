use std::future::Future;
use std::sync::Arc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use tracing::{info, error, debug};
use crate::config::EngineConfig;
use crate::compiler::validator::Validator;
use crate::dsl::Definition;
use crate::error::{EngineError, EngineResult};
use crate::nodes;
use crate::nodes::guard::Variables;
use crate::runtime::blueprint::{BlueprintKind, NodeIndex};
use crate::runtime::deployment::{Deployment, DeploymentStore, DeploymentSummary};
use crate::runtime::identity::{IdentityProvider, StaticIdentityProvider};
use crate::runtime::instance::{Instance, Token};
use crate::runtime::ledger::PendingTask;
use crate::runtime::node::{Node, NodeError};
use crate::runtime::storage::{
    DefinitionRepository, InMemoryDefinitionRepository, InMemoryInstanceStore, InMemoryTaskStore,
    InstanceStore, TaskStore,
};
use crate::runtime::syscall::Syscall;

pub(crate) type ExecutableNodes = Arc<Vec<Box<dyn Node>>>;

pub struct Engine {
    pub(crate) config: EngineConfig,
    deployments: DeploymentStore,
    pub(crate) instances: Arc<dyn InstanceStore>,
    pub(crate) tasks: Arc<dyn TaskStore>,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    // Instantiated Nodes (JIT Cache), keyed by deployment
    executable_cache: DashMap<Uuid, ExecutableNodes>,
    // One lock per instance; start/complete/claim/terminate on the same
    // instance are serialized through it.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Jump(NodeIndex),
    Wait,
    Terminate,
}

#[derive(Default)]
struct EngineSyscall {
    outcome: Option<Outcome>,
}

impl Syscall for EngineSyscall {
    fn jump(&mut self, target: NodeIndex) {
        self.outcome = Some(Outcome::Jump(target));
    }

    fn wait(&mut self) {
        self.outcome = Some(Outcome::Wait);
    }

    fn terminate(&mut self) {
        self.outcome = Some(Outcome::Terminate);
    }
}

/// How a token enters the advancement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// The token just arrived at its node.
    Arrive,
    /// The token was parked and is being released.
    Resume,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let identity = Arc::new(StaticIdentityProvider::new(config.users.clone()));
        Self::new_with_storage(
            config,
            Arc::new(InMemoryDefinitionRepository::new()),
            Arc::new(InMemoryInstanceStore::new()),
            Arc::new(InMemoryTaskStore::new()),
            identity,
        )
    }

    pub fn new_with_storage(
        config: EngineConfig,
        definitions: Arc<dyn DefinitionRepository>,
        instances: Arc<dyn InstanceStore>,
        tasks: Arc<dyn TaskStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            deployments: DeploymentStore::new(Validator::from_config(&config), definitions),
            config,
            instances,
            tasks,
            identity,
            executable_cache: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn deployments(&self) -> &DeploymentStore {
        &self.deployments
    }

    // --- Deployment ---

    pub async fn deploy(&self, definition: Definition) -> EngineResult<DeploymentSummary> {
        self.deployments.deploy(definition).await
    }

    pub async fn definition(&self, id: &str, version: u32) -> EngineResult<Definition> {
        Ok(self.deployments.get(id, version).await?.definition.clone())
    }

    pub async fn list_definitions(&self) -> EngineResult<Vec<DeploymentSummary>> {
        self.deployments.list().await
    }

    fn prepare_nodes(&self, deployment: &Deployment) -> EngineResult<ExecutableNodes> {
        if let Some(nodes) = self.executable_cache.get(&deployment.deployment_id) {
            return Ok(nodes.clone());
        }

        let nodes = deployment.blueprint.nodes.iter()
            .map(nodes::prepare)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| EngineError::Prepare {
                deployment_id: deployment.deployment_id,
                source,
            })?;

        let arc_nodes = Arc::new(nodes);
        self.executable_cache.insert(deployment.deployment_id, arc_nodes.clone());
        Ok(arc_nodes)
    }

    pub(crate) async fn deployment_of(&self, instance: &Instance) -> EngineResult<(Arc<Deployment>, ExecutableNodes)> {
        let deployment = self.deployments
            .get(&instance.definition_id, instance.definition_version)
            .await?;
        let nodes = self.prepare_nodes(&deployment)?;
        Ok((deployment, nodes))
    }

    fn lock_for(&self, instance_id: Uuid) -> Arc<Mutex<()>> {
        // Clone the Arc so the map shard is released before awaiting the lock.
        self.locks.entry(instance_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Drops the lock entry unless another caller still holds or awaits it.
    fn release_lock(&self, instance_id: Uuid) {
        self.locks.remove_if(&instance_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Runs `work` under the instance's lock. `work` is not polled before
    /// the lock is held.
    pub(crate) async fn locked<T>(&self, instance_id: Uuid, work: impl Future<Output = T>) -> T {
        let lock = self.lock_for(instance_id);
        let out = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.release_lock(instance_id);
        out
    }

    /// Number of instances with a live lock entry.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    // --- Instances ---

    /// Creates an instance of the given definition (latest version when
    /// `version` is `None`) and advances it to its first wait state.
    pub async fn start(
        &self,
        definition_id: &str,
        version: Option<u32>,
        initial_variables: Variables,
    ) -> EngineResult<Instance> {
        let deployment = self.deployments.resolve(definition_id, version).await?;
        let nodes = self.prepare_nodes(&deployment)?;
        let blueprint = &deployment.blueprint;

        let mut instance = Instance::new(
            &deployment.definition.id,
            deployment.definition.version,
            initial_variables,
        );
        let start = blueprint.start_index;
        instance.tokens.push(Token::new(instance.id, start, &blueprint.nodes[start]));

        let instance_id = instance.id;
        self.locked(instance_id, async move {
            info!(
                instance_id = %instance.id,
                definition_id = %instance.definition_id,
                version = instance.definition_version,
                "Instance started"
            );

            let advanced = self.advance(&mut instance, 0, &deployment, &nodes, Entry::Arrive);
            self.settle(instance, advanced).await
        })
        .await
    }

    pub async fn instance(&self, instance_id: Uuid) -> EngineResult<Instance> {
        self.instances.load(instance_id).await?
            .ok_or(EngineError::InstanceNotFound(instance_id))
    }

    pub async fn list_instances(&self) -> EngineResult<Vec<Instance>> {
        Ok(self.instances.list().await?)
    }

    /// Administrative stop. Drops every pending task of the instance.
    pub async fn terminate(&self, instance_id: Uuid, reason: &str) -> EngineResult<Instance> {
        self.locked(instance_id, self.terminate_locked(instance_id, reason)).await
    }

    async fn terminate_locked(&self, instance_id: Uuid, reason: &str) -> EngineResult<Instance> {
        let mut instance = self.instance(instance_id).await?;
        if !instance.is_running() {
            return Err(EngineError::InstanceNotRunning { instance_id, status: instance.status });
        }

        instance.mark_terminated(reason.to_string());
        let dropped = self.tasks.remove_by_instance(instance_id).await?;
        self.instances.save(&instance).await?;

        info!(instance_id = %instance_id, dropped_tasks = dropped.len(), reason, "Instance terminated");
        Ok(instance)
    }

    /// Drives the token at `token_pos` until it parks at a user task or ends.
    ///
    /// Works on the caller's copy of the instance, which is only persisted
    /// by [`Engine::settle`], so no intermediate position is ever visible.
    /// On error the token stays at the last node it fully entered.
    pub(crate) fn advance(
        &self,
        instance: &mut Instance,
        token_pos: usize,
        deployment: &Deployment,
        nodes: &[Box<dyn Node>],
        entry: Entry,
    ) -> EngineResult<Option<PendingTask>> {
        let blueprint = &deployment.blueprint;
        let mut entry = entry;
        let mut steps = 0usize;

        loop {
            let current = instance.tokens[token_pos].node_index;
            let mut syscall = EngineSyscall::default();
            let node = &nodes[current];
            let result = match entry {
                Entry::Arrive => node.execute(&instance.variables, &mut syscall),
                Entry::Resume => node.signal(&instance.variables, &mut syscall),
            };
            entry = Entry::Arrive;

            let node_id = &blueprint.nodes[current].id;
            result.map_err(|e| node_failure(instance.id, node_id, e))?;

            match syscall.outcome {
                Some(Outcome::Jump(target)) => {
                    steps += 1;
                    if steps > self.config.max_auto_steps {
                        return Err(EngineError::StepLimitExceeded {
                            instance_id: instance.id,
                            limit: self.config.max_auto_steps,
                        });
                    }
                    debug!(instance_id = %instance.id, from = %node_id, to = %blueprint.nodes[target].id, "Token moved");
                    instance.tokens[token_pos].move_to(target, &blueprint.nodes[target]);
                }
                Some(Outcome::Wait) => {
                    let bp_node = &blueprint.nodes[current];
                    let candidate_groups = match &bp_node.kind {
                        BlueprintKind::UserTask { candidate_groups } => candidate_groups.clone(),
                        _ => Vec::new(),
                    };
                    let task = PendingTask::new(&instance.tokens[token_pos], &bp_node.name, candidate_groups);
                    return Ok(Some(task));
                }
                Some(Outcome::Terminate) => {
                    if instance.all_tokens_ended() {
                        instance.mark_completed();
                    }
                    return Ok(None);
                }
                None => {
                    return Err(EngineError::NoMatchingTransition {
                        instance_id: instance.id,
                        node_id: node_id.clone(),
                    });
                }
            }
        }
    }

    /// Persists the result of an advancement. A runtime failure terminates
    /// the instance (recording the cause) and is then returned to the caller.
    pub(crate) async fn settle(
        &self,
        mut instance: Instance,
        advanced: EngineResult<Option<PendingTask>>,
    ) -> EngineResult<Instance> {
        match advanced {
            Ok(task) => {
                // Task first, so a parked token always has its task.
                if let Some(task) = task {
                    info!(instance_id = %instance.id, task_id = %task.id, node_id = %task.node_id, "Task created");
                    self.tasks.insert(task).await?;
                }
                self.instances.save(&instance).await?;
                if !instance.is_running() {
                    info!(instance_id = %instance.id, "Instance completed");
                }
                Ok(instance)
            }
            Err(e) if e.is_fatal_to_instance() => {
                error!(instance_id = %instance.id, error = %e, "Instance terminated by runtime error");
                instance.mark_terminated(e.to_string());
                self.tasks.remove_by_instance(instance.id).await?;
                self.instances.save(&instance).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

fn node_failure(instance_id: Uuid, node_id: &str, err: NodeError) -> EngineError {
    match err {
        NodeError::Evaluation(source) => EngineError::Evaluation {
            instance_id,
            node_id: node_id.to_string(),
            source,
        },
        NodeError::NoMatchingTransition | NodeError::NotWaiting => EngineError::NoMatchingTransition {
            instance_id,
            node_id: node_id.to_string(),
        },
    }
}
