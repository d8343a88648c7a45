//! Action tags used to route between nodes.

use std::fmt;

/// A routing tag emitted by a node's finalize phase.
///
/// Actions carry no payload; data travels through [`Memory`](crate::Memory).
/// Applications declare their actions as constants:
///
/// ```
/// use tubelens_flow::Action;
///
/// const SIMILARITY: Action = Action::new("similarity");
/// assert_eq!(SIMILARITY.name(), "similarity");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action(&'static str);

impl Action {
    /// The implicit action for nodes that do not discriminate.
    pub const DEFAULT: Action = Action("default");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
