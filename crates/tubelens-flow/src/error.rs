//! Error types for the flow engine.

use thiserror::Error;

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Lifecycle phase of a node, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Execute,
    Finalize,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Prepare => write!(f, "prepare"),
            Phase::Execute => write!(f, "execute"),
            Phase::Finalize => write!(f, "finalize"),
        }
    }
}

/// Errors that can occur while building or running flows.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A flow was built without any nodes.
    #[error("Flow '{0}' has no nodes")]
    EmptyFlow(String),

    /// A transition or entry refers to a node that was never added.
    #[error("Flow '{flow}' refers to unknown node #{index}")]
    UnknownNode { flow: String, index: usize },

    /// A transition uses an action the source node never emits.
    #[error("Node '{node}' does not declare action '{action}' (flow '{flow}')")]
    UnknownAction {
        flow: String,
        node: String,
        action: String,
    },

    /// Two transitions leave the same node on the same action.
    #[error("Node '{node}' already has a successor for action '{action}' (flow '{flow}')")]
    DuplicateTransition {
        flow: String,
        node: String,
        action: String,
    },

    /// The transition graph contains a cycle and cycles were not allowed.
    #[error("Flow '{0}' contains a cycle; call allow_cycles() for intentional loops")]
    CycleDetected(String),

    /// A node emitted an action outside its declared set.
    #[error("Node '{node}' emitted undeclared action '{action}'")]
    UndeclaredAction { node: String, action: String },

    /// The runtime visit cap was exceeded.
    #[error("Too many visits to node '{node}' in flow '{flow}' (max {max})")]
    TooManyVisits {
        flow: String,
        node: String,
        max: usize,
    },

    /// A node phase failed.
    #[error("Node '{node}' failed during {phase}: {source:#}")]
    NodeFailed {
        node: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// A required memory key is absent from both local and global scope.
    #[error("Memory key '{0}' is not set")]
    MissingKey(String),

    /// A memory value could not be converted to or from JSON.
    #[error("Memory value for '{key}' has unexpected shape: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A result slot was written twice.
    #[error("Result slot {0} was already filled")]
    SlotAlreadyFilled(usize),
}

impl FlowError {
    /// Wrap a node failure with its name and phase.
    pub fn node_failed(node: impl Into<String>, phase: Phase, source: anyhow::Error) -> Self {
        Self::NodeFailed {
            node: node.into(),
            phase,
            source,
        }
    }

    /// Returns true if this error was raised while building a flow.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFlow(_)
                | Self::UnknownNode { .. }
                | Self::UnknownAction { .. }
                | Self::DuplicateTransition { .. }
                | Self::CycleDetected(_)
        )
    }
}
