//! Fan-out/fan-in over a list of items.
//!
//! A [`ParallelFlow`] asks its [`Fanout`] source for items, runs one
//! traversal of the branch flow per item on a [`JoinSet`], waits for every
//! branch to finish, then publishes the branch results as one array in
//! global memory.
//!
//! Each branch gets:
//!
//! - the parent's resources and global map (shared, last write wins)
//! - a fresh local map holding `item`, `index` and any shared locals
//! - a [`SlotHandle`](crate::SlotHandle) for its own result slot
//!
//! A failed or panicked branch is logged and publishes `null`, even if it
//! filled its slot before failing. Siblings keep running and the parallel
//! flow still emits `DEFAULT`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::error::{FlowError, Phase, Result};
use crate::flow::Flow;
use crate::memory::{INDEX_KEY, ITEM_KEY, Memory};
use crate::node::Runnable;
use crate::slots::ResultSlots;

/// Default visit cap for each branch traversal.
pub const DEFAULT_BRANCH_MAX_VISITS: usize = 5_000_000;

/// Produces the items a [`ParallelFlow`] fans out over.
#[async_trait]
pub trait Fanout<R>: Send + Sync {
    async fn items(&self, memory: &mut Memory<R>) -> anyhow::Result<Vec<Value>>;
}

/// Runs a branch flow once per item, concurrently, and collects results.
pub struct ParallelFlow<R> {
    name: String,
    source: Box<dyn Fanout<R>>,
    branch: Arc<Flow<R>>,
    results_key: String,
    locals: Map<String, Value>,
    max_concurrency: Option<usize>,
    branch_max_visits: usize,
}

impl<R: Send + Sync + 'static> ParallelFlow<R> {
    pub fn new(
        name: impl Into<String>,
        source: impl Fanout<R> + 'static,
        branch: Flow<R>,
        results_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
            branch: Arc::new(branch),
            results_key: results_key.into(),
            locals: Map::new(),
            max_concurrency: None,
            branch_max_visits: DEFAULT_BRANCH_MAX_VISITS,
        }
    }

    /// Add a local value copied into every branch.
    pub fn with_local(mut self, key: impl Into<String>, value: Value) -> Self {
        self.locals.insert(key.into(), value);
        self
    }

    /// Limit how many branches run at once.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    pub fn branch_max_visits(mut self, max: usize) -> Self {
        self.branch_max_visits = max;
        self
    }

    pub fn results_key(&self) -> &str {
        &self.results_key
    }

    async fn fan_out(&self, memory: &mut Memory<R>) -> Result<Action> {
        let items = self
            .source
            .items(memory)
            .await
            .map_err(|e| FlowError::node_failed(&self.name, Phase::Prepare, e))?;

        let total = items.len();
        let slots = ResultSlots::new(total);
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        info!(stage = %self.name, branches = total, "Fanning out");

        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(total);

        for (handle, item) in slots.handles().zip(items) {
            let index = handle.index();
            let mut local = self.locals.clone();
            local.insert(ITEM_KEY.to_string(), item);
            local.insert(INDEX_KEY.to_string(), Value::from(index));

            let mut branch_memory = memory.branch(local, handle);
            let branch = Arc::clone(&self.branch);
            let semaphore = semaphore.clone();
            let max_visits = self.branch_max_visits;

            let abort = tasks.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                branch.run_bounded(&mut branch_memory, max_visits).await
            });
            task_index.insert(abort.id(), index);
        }

        // Barrier: every branch is joined before results are published.
        let mut failed = HashSet::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, Ok(action))) => {
                    let index = task_index.get(&id).copied();
                    debug!(stage = %self.name, index = ?index, action = %action, "Branch finished");
                    let unfilled = index
                        .and_then(|i| slots.handle(i))
                        .is_some_and(|h| !h.is_filled());
                    if unfilled {
                        warn!(stage = %self.name, index = ?index, "Branch finished without a result");
                    }
                }
                Ok((id, Err(e))) => {
                    let index = task_index.get(&id).copied();
                    error!(stage = %self.name, index = ?index, error = %e, "Branch failed");
                    failed.extend(index);
                }
                Err(join_error) => {
                    let index = task_index.get(&join_error.id()).copied();
                    error!(stage = %self.name, index = ?index, error = %join_error, "Branch panicked");
                    failed.extend(index);
                }
            }
        }

        // A failed branch never publishes, whatever it wrote before failing.
        let results: Vec<Value> = slots
            .values()
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(value) if !failed.contains(&index) => value,
                _ => Value::Null,
            })
            .collect();
        let filled = results.iter().filter(|v| !v.is_null()).count();
        memory.set_global_value(self.results_key.clone(), Value::Array(results));

        info!(
            stage = %self.name,
            branches = total,
            filled,
            failed = failed.len(),
            results_key = %self.results_key,
            "Fan-in complete"
        );
        Ok(Action::DEFAULT)
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> Runnable<R> for ParallelFlow<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::DEFAULT]
    }

    async fn run(&self, memory: &mut Memory<R>) -> Result<Action> {
        self.fan_out(memory).await
    }
}
