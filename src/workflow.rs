//! The workflow contract: one stateful node in the render tree.

use crate::render::RenderContext;

/// A node in the render tree.
///
/// The host calls [`render`](Workflow::render) after every state change. During
/// render the workflow declares the workers and child workflows it wants
/// running; the context diffs those declarations against the previous pass.
/// Render must not block: results arrive later through sinks.
pub trait Workflow: Sized + Send + 'static {
    /// Persistent state of the node.
    type State: Send + 'static;
    /// Values reported to the parent.
    type Output: Send + 'static;
    /// Result of a render pass.
    type Rendering;
    /// Slot kept across renders, e.g. for a [`Lifetime`](crate::Lifetime).
    type Storage: Default + Send + 'static;

    /// Initial state, computed once when the node is created.
    fn make_initial_state(&self) -> Self::State;

    /// Called when the parent re-renders this node with a new value of the workflow.
    fn workflow_did_change(&self, _previous: &Self, _state: &mut Self::State) {}

    /// Produce the rendering for the current state.
    fn render(&self, state: &Self::State, context: &mut RenderContext<'_, Self>)
    -> Self::Rendering;
}

/// Conversion of an external source into a schedulable workflow.
pub trait IntoWorkflow {
    /// The adapter workflow.
    type Workflow: Workflow;

    /// Wrap `self` in its adapter.
    fn into_workflow(self) -> Self::Workflow;
}
