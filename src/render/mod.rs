//! Rendering: the render context, slot diffing, and the node tree.
//!
//! Core components:
//! - `diff` decides start/continue/replace/stop for one declaration slot
//! - `context` is what a workflow's `render` sees
//! - `node` holds live state and routes deliveries back to it

pub mod context;
pub mod diff;
pub(crate) mod node;

pub use context::RenderContext;
pub use diff::{SlotChange, SlotKey, diff_slot};
pub use node::NodeId;
