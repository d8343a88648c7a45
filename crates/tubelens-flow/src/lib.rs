//! Action-routed node graph engine for tubelens pipelines.
//!
//! The engine has four pieces:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Node          prepare → execute → finalize → Action         │
//! │  Flow          entry + (node, action) → node transitions     │
//! │  ParallelFlow  fan-out items → branch Flow per item → slots  │
//! │  Memory        typed resources + global map + local overlay  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flows and parallel flows are themselves [`Runnable`] steps, so a flow
//! can contain sub-flows. Data moves between steps only through
//! [`Memory`]; actions carry no payload.

pub mod action;
pub mod error;
pub mod flow;
pub mod memory;
pub mod node;
pub mod parallel;
pub mod slots;

pub use action::Action;
pub use error::{FlowError, Phase, Result};
pub use flow::{DEFAULT_MAX_VISITS, Flow, FlowBuilder, NodeId};
pub use memory::{INDEX_KEY, ITEM_KEY, Memory};
pub use node::{Node, NodeRunner, Runnable};
pub use parallel::{DEFAULT_BRANCH_MAX_VISITS, Fanout, ParallelFlow};
pub use slots::{ResultSlots, SlotHandle};
