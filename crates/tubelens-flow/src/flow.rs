//! Sequential flows: an entry node and an action-keyed transition table.
//!
//! A [`Flow`] runs its entry node, looks up the successor for the emitted
//! action, and repeats until an action has no successor. That final action
//! becomes the flow's own result, so flows nest inside other flows.
//!
//! ```text
//! ┌──────────┐ default ┌──────────┐ similarity ┌────────────┐
//! │  ingest  │────────▶│  embed   │───────────▶│  matching  │
//! └──────────┘         └──────────┘            └────────────┘
//!                           │ content
//!                           ▼
//!                      ┌──────────┐
//!                      │ rewrite  │
//!                      └──────────┘
//! ```
//!
//! Transitions are validated by [`FlowBuilder::build`]: unknown nodes,
//! actions a node never declares, duplicate transitions and unapproved
//! cycles are all rejected before anything runs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use tracing::{debug, info};

use crate::action::Action;
use crate::error::{FlowError, Result};
use crate::memory::Memory;
use crate::node::{Node, NodeRunner, Runnable};

/// Default cap on visits to any single node during one traversal.
pub const DEFAULT_MAX_VISITS: usize = 10_000;

/// Index of a node within a [`FlowBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a validated [`Flow`].
pub struct FlowBuilder<R> {
    name: String,
    nodes: Vec<Box<dyn Runnable<R>>>,
    transitions: Vec<(NodeId, Action, NodeId)>,
    entry: Option<NodeId>,
    max_visits: usize,
    allow_cycles: bool,
}

impl<R: Send + Sync + 'static> FlowBuilder<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            transitions: Vec::new(),
            entry: None,
            max_visits: DEFAULT_MAX_VISITS,
            allow_cycles: false,
        }
    }

    /// Add a node. The first node added is the entry unless
    /// [`entry`](Self::entry) says otherwise.
    pub fn add<N: Node<R> + 'static>(&mut self, node: N) -> NodeId {
        self.add_flow(NodeRunner::new(node))
    }

    /// Add a nested flow, parallel flow or other runnable step.
    pub fn add_flow<F: Runnable<R> + 'static>(&mut self, step: F) -> NodeId {
        self.nodes.push(Box::new(step));
        NodeId(self.nodes.len() - 1)
    }

    /// Route `action` emitted by `from` to `to`.
    pub fn connect(&mut self, from: NodeId, action: Action, to: NodeId) -> &mut Self {
        self.transitions.push((from, action, to));
        self
    }

    /// Shorthand for a `DEFAULT` transition.
    pub fn then(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.connect(from, Action::DEFAULT, to)
    }

    pub fn entry(&mut self, id: NodeId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    /// Cap on visits to any single node during one traversal.
    pub fn max_visits(&mut self, max: usize) -> &mut Self {
        self.max_visits = max;
        self
    }

    /// Permit cycles in the transition graph (intentional retry loops).
    pub fn allow_cycles(&mut self) -> &mut Self {
        self.allow_cycles = true;
        self
    }

    /// Validate the graph and produce a runnable flow.
    pub fn build(self) -> Result<Flow<R>> {
        if self.nodes.is_empty() {
            return Err(FlowError::EmptyFlow(self.name));
        }

        let count = self.nodes.len();
        let check = |id: NodeId| {
            if id.0 < count {
                Ok(id.0)
            } else {
                Err(FlowError::UnknownNode {
                    flow: self.name.clone(),
                    index: id.0,
                })
            }
        };

        let entry = check(self.entry.unwrap_or(NodeId(0)))?;

        let mut table: HashMap<(usize, Action), usize> = HashMap::new();
        let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(count, self.transitions.len());
        let graph_nodes: Vec<_> = (0..count).map(|_| graph.add_node(())).collect();

        for &(from, action, to) in &self.transitions {
            let from = check(from)?;
            let to = check(to)?;
            let source = &self.nodes[from];

            if !source.actions().contains(&action) {
                return Err(FlowError::UnknownAction {
                    flow: self.name.clone(),
                    node: source.name().to_string(),
                    action: action.to_string(),
                });
            }
            if table.insert((from, action), to).is_some() {
                return Err(FlowError::DuplicateTransition {
                    flow: self.name.clone(),
                    node: source.name().to_string(),
                    action: action.to_string(),
                });
            }
            graph.add_edge(graph_nodes[from], graph_nodes[to], ());
        }

        if !self.allow_cycles && is_cyclic_directed(&graph) {
            return Err(FlowError::CycleDetected(self.name));
        }

        let mut terminal_actions = BTreeSet::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for action in node.actions() {
                if !table.contains_key(&(index, action)) {
                    terminal_actions.insert(action);
                }
            }
        }

        debug!(
            flow = %self.name,
            nodes = count,
            transitions = self.transitions.len(),
            "Built flow"
        );

        Ok(Flow {
            name: self.name,
            nodes: self.nodes,
            transitions: table,
            entry,
            max_visits: self.max_visits,
            terminal_actions: terminal_actions.into_iter().collect(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flow
// ─────────────────────────────────────────────────────────────────────────────

/// A validated graph of steps routed by actions.
pub struct Flow<R> {
    name: String,
    nodes: Vec<Box<dyn Runnable<R>>>,
    transitions: HashMap<(usize, Action), usize>,
    entry: usize,
    max_visits: usize,
    terminal_actions: Vec<Action>,
}

impl<R: Send + Sync + 'static> Flow<R> {
    pub fn builder(name: impl Into<String>) -> FlowBuilder<R> {
        FlowBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions with no successor; the flow can end on any of them.
    pub fn terminal_actions(&self) -> &[Action] {
        &self.terminal_actions
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Traverse the flow from its entry and return the final action.
    pub async fn run(&self, memory: &mut Memory<R>) -> Result<Action> {
        self.run_bounded(memory, self.max_visits).await
    }

    pub(crate) async fn run_bounded(
        &self,
        memory: &mut Memory<R>,
        max_visits: usize,
    ) -> Result<Action> {
        let mut visits = vec![0usize; self.nodes.len()];
        let mut current = self.entry;

        debug!(flow = %self.name, index = ?memory.index(), "Flow started");

        loop {
            visits[current] += 1;
            let node = &self.nodes[current];
            if visits[current] > max_visits {
                return Err(FlowError::TooManyVisits {
                    flow: self.name.clone(),
                    node: node.name().to_string(),
                    max: max_visits,
                });
            }

            debug!(flow = %self.name, node = node.name(), "Running node");
            let action = node.run(memory).await?;

            match self.transitions.get(&(current, action)) {
                Some(&next) => {
                    debug!(
                        flow = %self.name,
                        from = node.name(),
                        action = %action,
                        to = self.nodes[next].name(),
                        "Transition"
                    );
                    current = next;
                }
                None => {
                    if memory.index().is_none() {
                        info!(flow = %self.name, action = %action, "Flow finished");
                    } else {
                        debug!(flow = %self.name, action = %action, "Flow finished");
                    }
                    return Ok(action);
                }
            }
        }
    }
}

impl<R> fmt::Debug for Flow<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<&str> = self.nodes.iter().map(|n| n.name()).collect();
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("nodes", &nodes)
            .field("entry", &self.entry)
            .field("max_visits", &self.max_visits)
            .field("terminal_actions", &self.terminal_actions)
            .finish()
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> Runnable<R> for Flow<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> Vec<Action> {
        self.terminal_actions.clone()
    }

    async fn run(&self, memory: &mut Memory<R>) -> Result<Action> {
        Flow::run(self, memory).await
    }
}
