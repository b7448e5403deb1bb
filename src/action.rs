//! Actions: the only way state changes.

use std::fmt;

use crate::workflow::Workflow;

/// A state transition for workflow `W`, optionally producing an output.
pub trait WorkflowAction<W: Workflow>: Send + 'static {
    /// Apply the action to the node's state.
    fn apply(self, state: &mut W::State) -> Option<W::Output>;
}

type ApplyFn<W> =
    Box<dyn FnOnce(&mut <W as Workflow>::State) -> Option<<W as Workflow>::Output> + Send>;

/// Type-erased action.
///
/// Either forwards a value as the node's output, or runs a closure against the
/// node's state.
pub struct AnyWorkflowAction<W: Workflow> {
    kind: ActionKind<W>,
}

enum ActionKind<W: Workflow> {
    SendOutput(W::Output),
    Update(ApplyFn<W>),
}

impl<W: Workflow> AnyWorkflowAction<W> {
    /// Action that leaves state untouched and emits `output`.
    pub fn sending_output(output: W::Output) -> Self {
        Self {
            kind: ActionKind::SendOutput(output),
        }
    }

    /// Action backed by a closure over the node's state.
    pub fn new(apply: impl FnOnce(&mut W::State) -> Option<W::Output> + Send + 'static) -> Self {
        Self {
            kind: ActionKind::Update(Box::new(apply)),
        }
    }

    /// Erase a typed action.
    pub fn from_action<A: WorkflowAction<W>>(action: A) -> Self {
        Self::new(move |state| action.apply(state))
    }

    /// Action that does nothing. Still triggers a render when delivered.
    pub fn noop() -> Self {
        Self::new(|_| None)
    }
}

impl<W: Workflow> WorkflowAction<W> for AnyWorkflowAction<W> {
    fn apply(self, state: &mut W::State) -> Option<W::Output> {
        match self.kind {
            ActionKind::SendOutput(output) => Some(output),
            ActionKind::Update(apply) => apply(state),
        }
    }
}

impl<W: Workflow> fmt::Debug for AnyWorkflowAction<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ActionKind::SendOutput(_) => "send_output",
            ActionKind::Update(_) => "update",
        };
        f.debug_struct("AnyWorkflowAction")
            .field("workflow", &std::any::type_name::<W>())
            .field("kind", &kind)
            .finish()
    }
}
