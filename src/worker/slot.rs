//! Running worker slots.

use std::any::Any;

use crate::action::AnyWorkflowAction;
use crate::lifetime::Lifetime;
use crate::worker::Worker;
use crate::workflow::Workflow;

pub(crate) type OutputHandler<W, O> = Box<dyn Fn(O) -> AnyWorkflowAction<W> + Send>;

/// A started worker: its declaration of record, its lifetime, and the handler
/// mapping its outputs into actions of the declaring node.
pub(crate) struct WorkerSlot<W: Workflow, K: Worker> {
    pub(crate) worker: K,
    pub(crate) lifetime: Lifetime,
    pub(crate) on_output: OutputHandler<W, K::Output>,
}

/// Type-erased view of a [`WorkerSlot`], recovered by downcast on the slot's kind.
pub(crate) trait AnyWorkerSlot<W: Workflow>: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    fn lifetime(&self) -> &Lifetime;
}

impl<W: Workflow, K: Worker> AnyWorkerSlot<W> for WorkerSlot<W, K> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }
}
