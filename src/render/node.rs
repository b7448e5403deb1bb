//! Tree nodes and the delivery path from sinks back into node state.
//!
//! Every delivery is a closure over the root node. A child's deliveries are
//! wrapped by its parent so that applying one walks down to the child, applies
//! the child's action, and feeds any child output back up as a parent action.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Poll;

use futures::future::poll_fn;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::runtime::Handle;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::action::{AnyWorkflowAction, WorkflowAction};
use crate::lifetime::LifetimeToken;
use crate::render::context::RenderContext;
use crate::render::diff::{SlotKey, SlotKeys};
use crate::worker::Worker;
use crate::worker::slot::{AnyWorkerSlot, OutputHandler, WorkerSlot};
use crate::workflow::Workflow;

/// Unique identity of one node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) type Update<W> =
    Box<dyn FnOnce(&mut WorkflowNode<W>) -> Option<<W as Workflow>::Output> + Send>;

/// One queued state change, optionally scoped to the lifetime of the task
/// that produced it.
pub(crate) struct Delivery<W: Workflow> {
    pub(crate) scope: Option<LifetimeToken>,
    pub(crate) update: Update<W>,
}

impl<W: Workflow> Delivery<W> {
    /// A scoped delivery whose lifetime has ended must not be applied.
    pub(crate) fn is_stale(&self) -> bool {
        self.scope.as_ref().is_some_and(LifetimeToken::is_ended)
    }
}

pub(crate) type Dispatch<W> = Arc<dyn Fn(Delivery<W>) + Send + Sync>;

/// Child node plus the handler mapping its outputs into parent actions.
pub(crate) struct ChildNode<P: Workflow, C: Workflow> {
    pub(crate) node: WorkflowNode<C>,
    pub(crate) on_output: OutputHandler<P, C::Output>,
}

pub(crate) trait AnyChild<P: Workflow>: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    fn teardown(&mut self);
}

impl<P: Workflow, C: Workflow> AnyChild<P> for ChildNode<P, C> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn teardown(&mut self) {
        self.node.teardown();
    }
}

/// Declarations of one node: what ran last pass and what this pass declared.
pub(crate) struct RenderSlots<W: Workflow> {
    pub(crate) keys: SlotKeys,
    pub(crate) previous_workers: HashMap<SlotKey, Box<dyn AnyWorkerSlot<W>>>,
    pub(crate) workers: HashMap<SlotKey, Box<dyn AnyWorkerSlot<W>>>,
    pub(crate) previous_children: HashMap<SlotKey, Box<dyn AnyChild<W>>>,
    pub(crate) children: HashMap<SlotKey, Box<dyn AnyChild<W>>>,
}

impl<W: Workflow> Default for RenderSlots<W> {
    fn default() -> Self {
        Self {
            keys: SlotKeys::default(),
            previous_workers: HashMap::new(),
            workers: HashMap::new(),
            previous_children: HashMap::new(),
            children: HashMap::new(),
        }
    }
}

impl<W: Workflow> RenderSlots<W> {
    fn begin(&mut self) {
        self.keys.reset();
        self.previous_workers = std::mem::take(&mut self.workers);
        self.previous_children = std::mem::take(&mut self.children);
    }

    /// Stop everything the pass did not re-declare.
    fn finish(&mut self, node_id: NodeId) {
        for (slot, worker) in self.previous_workers.drain() {
            debug!(node_id = %node_id, slot = %slot, "Stopping worker");
            worker.lifetime().end();
        }
        for (slot, mut child) in self.previous_children.drain() {
            debug!(node_id = %node_id, slot = %slot, "Tearing down child");
            child.teardown();
        }
    }

    fn clear(&mut self, node_id: NodeId) {
        self.begin();
        self.finish(node_id);
    }
}

/// A live node: workflow value, state, storage and declarations.
pub(crate) struct WorkflowNode<W: Workflow> {
    pub(crate) id: NodeId,
    workflow: W,
    pub(crate) state: W::State,
    storage: W::Storage,
    slots: RenderSlots<W>,
    dispatch: Dispatch<W>,
    runtime: Handle,
}

impl<W: Workflow> WorkflowNode<W> {
    pub(crate) fn new(id: NodeId, workflow: W, dispatch: Dispatch<W>, runtime: Handle) -> Self {
        let state = workflow.make_initial_state();
        Self {
            id,
            workflow,
            state,
            storage: W::Storage::default(),
            slots: RenderSlots::default(),
            dispatch,
            runtime,
        }
    }

    /// Run one render pass and diff its declarations against the last one.
    pub(crate) fn render(&mut self) -> W::Rendering {
        self.slots.begin();

        let mut context = RenderContext {
            node_id: self.id,
            storage: &mut self.storage,
            slots: &mut self.slots,
            dispatch: &self.dispatch,
            runtime: &self.runtime,
        };
        let rendering = self.workflow.render(&self.state, &mut context);

        self.slots.finish(self.id);
        rendering
    }

    /// Replace the workflow value, letting it adjust state first.
    pub(crate) fn update_workflow(&mut self, workflow: W) {
        workflow.workflow_did_change(&self.workflow, &mut self.state);
        self.workflow = workflow;
    }

    /// End every running task and tear down every child.
    pub(crate) fn teardown(&mut self) {
        self.slots.clear(self.id);
        self.storage = W::Storage::default();
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.slots.workers.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.slots.children.len()
    }

    /// Lifetimes of the running workers, ordered by slot.
    pub(crate) fn worker_lifetimes(&self) -> Vec<(SlotKey, LifetimeToken)> {
        let mut lifetimes: Vec<_> = self
            .slots
            .workers
            .iter()
            .map(|(slot, worker)| (slot.clone(), worker.lifetime().token()))
            .collect();
        lifetimes.sort_by(|(a, _), (b, _)| {
            (a.kind_name(), a.key(), a.ordinal()).cmp(&(b.kind_name(), b.key(), b.ordinal()))
        });
        lifetimes
    }

    /// Apply an output of the worker in `slot` through its latest handler.
    pub(crate) fn apply_worker_output<K: Worker>(
        &mut self,
        slot: &SlotKey,
        output: K::Output,
    ) -> Option<W::Output> {
        let Some(worker) = self
            .slots
            .workers
            .get_mut(slot)
            .and_then(|w| w.as_any_mut().downcast_mut::<WorkerSlot<W, K>>())
        else {
            trace!(node_id = %self.id, slot = %slot, "Discarding output of vanished worker");
            return None;
        };

        let action = (worker.on_output)(output);
        action.apply(&mut self.state)
    }

    /// Apply a child's update, then feed its output back into this node.
    pub(crate) fn apply_to_child<C: Workflow>(
        &mut self,
        slot: &SlotKey,
        child_id: NodeId,
        update: Update<C>,
    ) -> Option<W::Output> {
        let Some(child) = self
            .slots
            .children
            .get_mut(slot)
            .and_then(|c| c.as_any_mut().downcast_mut::<ChildNode<W, C>>())
            .filter(|c| c.node.id == child_id)
        else {
            trace!(node_id = %self.id, slot = %slot, "Discarding delivery for torn-down child");
            return None;
        };

        let output = update(&mut child.node)?;
        let action = (child.on_output)(output);
        action.apply(&mut self.state)
    }
}

/// Build the dispatch of a child by routing through its parent.
pub(crate) fn child_dispatch<P: Workflow, C: Workflow>(
    parent: Dispatch<P>,
    slot: SlotKey,
    child_id: NodeId,
) -> Dispatch<C> {
    Arc::new(move |delivery: Delivery<C>| {
        let slot = slot.clone();
        let update = delivery.update;
        parent(Delivery {
            scope: delivery.scope,
            update: Box::new(move |node: &mut WorkflowNode<P>| {
                node.apply_to_child::<C>(&slot, child_id, update)
            }),
        });
    })
}

/// Wrap a typed action as a delivery for its node.
pub(crate) fn action_update<W: Workflow, A: WorkflowAction<W>>(action: A) -> Update<W> {
    Box::new(move |node: &mut WorkflowNode<W>| action.apply(&mut node.state))
}

/// Upstream of one forwarding task, shared with the lifetime's teardown.
type SharedUpdates<W> = Arc<Mutex<Option<BoxStream<'static, Update<W>>>>>;

fn lock_updates<W: Workflow>(
    upstream: &SharedUpdates<W>,
) -> MutexGuard<'_, Option<BoxStream<'static, Update<W>>>> {
    upstream.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forward `updates` into `dispatch` until `scope` ends.
///
/// The task polls `updates` through a shared slot. Ending the lifetime empties
/// that slot before `end` returns, so the upstream subscription is released
/// synchronously; the task itself is aborted as well. Deliveries already in
/// the mailbox carry the scope and are discarded by the host.
pub(crate) fn spawn_forwarding<W, S>(
    runtime: &Handle,
    scope: LifetimeToken,
    updates: S,
    dispatch: Dispatch<W>,
) where
    W: Workflow,
    S: Stream<Item = Update<W>> + Send + 'static,
{
    let upstream: SharedUpdates<W> = Arc::new(Mutex::new(Some(updates.boxed())));

    let task_scope = scope.clone();
    let task_upstream = Arc::clone(&upstream);
    let handle = runtime.spawn(async move {
        loop {
            let next = poll_fn(|cx| match lock_updates(&task_upstream).as_mut() {
                Some(updates) => updates.poll_next_unpin(cx),
                None => Poll::Ready(None),
            });
            let Some(update) = next.await else {
                break;
            };
            if task_scope.is_ended() {
                break;
            }
            dispatch(Delivery {
                scope: Some(task_scope.clone()),
                update,
            });
        }
        trace!(lifetime = %task_scope.id(), "Forwarding finished");
    });

    let abort = handle.abort_handle();
    scope.on_end(move || {
        let released = lock_updates(&upstream).take();
        drop(released);
        abort.abort();
    });
}

/// Turn a worker's outputs into deliveries for its slot.
pub(crate) fn worker_updates<W: Workflow, K: Worker>(
    outputs: BoxStream<'static, K::Output>,
    slot: SlotKey,
) -> impl Stream<Item = Update<W>> + Send + 'static {
    outputs.map(move |output| {
        let slot = slot.clone();
        let update: Update<W> = Box::new(move |node: &mut WorkflowNode<W>| {
            node.apply_worker_output::<K>(&slot, output)
        });
        update
    })
}

/// Erase a typed output handler.
pub(crate) fn output_handler<W, O, A>(
    on_output: impl Fn(O) -> A + Send + 'static,
) -> OutputHandler<W, O>
where
    W: Workflow,
    A: WorkflowAction<W>,
{
    Box::new(move |output| AnyWorkflowAction::from_action(on_output(output)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::stream;

    use super::*;
    use crate::lifetime::Lifetime;

    struct Idle;

    impl Workflow for Idle {
        type State = ();
        type Output = ();
        type Rendering = ();
        type Storage = ();

        fn make_initial_state(&self) {}

        fn render(&self, _state: &(), _context: &mut RenderContext<'_, Self>) {}
    }

    /// Flags when the stream holding it is dropped.
    struct Held(Arc<AtomicBool>);

    impl Drop for Held {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn ending_scope_drops_upstream_before_returning() {
        let released = Arc::new(AtomicBool::new(false));
        let held = Held(Arc::clone(&released));
        let updates = stream::pending::<Update<Idle>>().map(move |update| {
            let _held = &held;
            update
        });

        let lifetime = Lifetime::new();
        let dispatch: Dispatch<Idle> = Arc::new(|_| {});
        spawn_forwarding(&Handle::current(), lifetime.token(), updates, dispatch);

        // The task is parked on the pending stream.
        tokio::task::yield_now().await;
        assert!(!released.load(Ordering::SeqCst));

        lifetime.end();
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn forwarding_stops_once_scope_has_ended() {
        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        let dispatch: Dispatch<Idle> = Arc::new(move |_| flag.store(true, Ordering::SeqCst));

        let lifetime = Lifetime::new();
        lifetime.end();
        let update: Update<Idle> = Box::new(|_| None);
        spawn_forwarding(
            &Handle::current(),
            lifetime.token(),
            stream::iter([update]),
            dispatch,
        );

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!delivered.load(Ordering::SeqCst));
    }
}
