//! Node lifecycle and the erased runnable form used by flows.

use async_trait::async_trait;

use crate::action::Action;
use crate::error::{FlowError, Phase, Result};
use crate::memory::Memory;

/// A unit of work with a three-phase lifecycle.
///
/// `prepare` reads what it needs from memory, `execute` does the work
/// without touching memory, and `finalize` writes results back and picks
/// the next action. Nodes hold only construction-time configuration.
#[async_trait]
pub trait Node<R: Send + Sync + 'static>: Send + Sync {
    /// Output of `prepare`, borrowed by `execute` and consumed by `finalize`.
    type Prep: Send + Sync;
    /// Output of `execute`.
    type Exec: Send;

    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Closed set of actions `finalize` may return.
    fn actions(&self) -> Vec<Action> {
        vec![Action::DEFAULT]
    }

    async fn prepare(&self, memory: &mut Memory<R>) -> anyhow::Result<Self::Prep>;

    async fn execute(&self, prep: &Self::Prep) -> anyhow::Result<Self::Exec>;

    async fn finalize(
        &self,
        memory: &mut Memory<R>,
        prep: Self::Prep,
        exec: Self::Exec,
    ) -> anyhow::Result<Action>;
}

/// Object-safe step of a flow: a node, a flow, or a parallel flow.
#[async_trait]
pub trait Runnable<R>: Send + Sync {
    fn name(&self) -> &str;

    /// Actions this step can emit.
    fn actions(&self) -> Vec<Action>;

    async fn run(&self, memory: &mut Memory<R>) -> Result<Action>;
}

/// Adapts a [`Node`] into a [`Runnable`].
pub struct NodeRunner<N> {
    node: N,
}

impl<N> NodeRunner<N> {
    pub fn new(node: N) -> Self {
        Self { node }
    }

    pub fn inner(&self) -> &N {
        &self.node
    }
}

#[async_trait]
impl<R, N> Runnable<R> for NodeRunner<N>
where
    R: Send + Sync + 'static,
    N: Node<R>,
{
    fn name(&self) -> &str {
        self.node.name()
    }

    fn actions(&self) -> Vec<Action> {
        self.node.actions()
    }

    async fn run(&self, memory: &mut Memory<R>) -> Result<Action> {
        let node = &self.node;
        let name = node.name();

        let prep = node
            .prepare(memory)
            .await
            .map_err(|e| FlowError::node_failed(name, Phase::Prepare, e))?;
        let exec = node
            .execute(&prep)
            .await
            .map_err(|e| FlowError::node_failed(name, Phase::Execute, e))?;
        let action = node
            .finalize(memory, prep, exec)
            .await
            .map_err(|e| FlowError::node_failed(name, Phase::Finalize, e))?;

        if !node.actions().contains(&action) {
            return Err(FlowError::UndeclaredAction {
                node: name.to_string(),
                action: action.to_string(),
            });
        }
        Ok(action)
    }
}
