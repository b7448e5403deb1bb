//! Render context: what a workflow sees while rendering.
//!
//! The context owns the bookkeeping between two render passes of one node:
//! every worker or child declared here is matched against the previous pass
//! by slot key, and the [`SlotChange`] decides whether it keeps running, is
//! replaced, or is started fresh. Slots that are not declared again are
//! stopped when the pass ends.

use std::convert::Infallible;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::runtime::Handle;
use tracing::debug;

use crate::action::{AnyWorkflowAction, WorkflowAction};
use crate::lifetime::{Lifetime, LifetimeToken};
use crate::reactive::{Property, PropertyWorkflow, Signal};
use crate::render::diff::{SlotChange, SlotKey, diff_slot};
use crate::render::node::{
    ChildNode, Delivery, Dispatch, NodeId, RenderSlots, WorkflowNode, action_update,
    child_dispatch, output_handler, spawn_forwarding, worker_updates,
};
use crate::sink::Sink;
use crate::worker::slot::{OutputHandler, WorkerSlot};
use crate::worker::{SignalWorker, Worker};
use crate::workflow::Workflow;

/// Per-node handle passed into [`Workflow::render`].
pub struct RenderContext<'a, W: Workflow> {
    pub(crate) node_id: NodeId,
    pub(crate) storage: &'a mut W::Storage,
    pub(crate) slots: &'a mut RenderSlots<W>,
    pub(crate) dispatch: &'a Dispatch<W>,
    pub(crate) runtime: &'a Handle,
}

impl<'a, W: Workflow> RenderContext<'a, W> {
    /// Identity of the node being rendered.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Create a sink delivering actions to this node.
    ///
    /// The sink stays valid across render passes. Once the node is torn down,
    /// sends are discarded.
    pub fn make_sink<A: WorkflowAction<W>>(&self) -> Sink<A> {
        let dispatch = Arc::clone(self.dispatch);
        Sink::new(move |action: A| {
            dispatch(Delivery {
                scope: None,
                update: action_update::<W, A>(action),
            });
        })
    }

    /// The node's storage slot, kept across render passes.
    pub fn storage(&self) -> &W::Storage {
        &*self.storage
    }

    /// Mutable access to the storage slot.
    pub fn storage_mut(&mut self) -> &mut W::Storage {
        &mut *self.storage
    }

    /// Declare a worker for this pass.
    ///
    /// If the previous pass declared an equivalent worker of the same kind
    /// under the same key, it keeps running and `worker` becomes its new
    /// declaration of record. Otherwise the previous worker (if any) is
    /// cancelled before `worker` is started. Every output is mapped through
    /// the most recently declared `on_output`.
    ///
    /// Declaring the same kind and key more than once in a pass creates
    /// independent slots, matched across passes by declaration order.
    pub fn await_result<K, A>(
        &mut self,
        worker: K,
        key: impl Into<String>,
        on_output: impl Fn(K::Output) -> A + Send + 'static,
    ) where
        K: Worker,
        A: WorkflowAction<W>,
    {
        let slot = self.slots.keys.next::<K>(key.into());
        let on_output = output_handler::<W, K::Output, A>(on_output);

        let previous = self
            .slots
            .previous_workers
            .remove(&slot)
            .and_then(|p| p.into_any().downcast::<WorkerSlot<W, K>>().ok());

        let running = match previous {
            Some(mut running) => {
                match diff_slot(Some(&running.worker), Some(&worker), K::is_equivalent) {
                    SlotChange::Continue => {
                        debug!(node_id = %self.node_id, slot = %slot, "Continuing worker");
                        running.worker = worker;
                        running.on_output = on_output;
                        running
                    }
                    change => {
                        debug!(node_id = %self.node_id, slot = %slot, change = %change, "Replacing worker");
                        running.lifetime.end();
                        drop(running);
                        self.start_worker(&slot, worker, on_output)
                    }
                }
            }
            None => self.start_worker(&slot, worker, on_output),
        };

        self.slots.workers.insert(slot, running);
    }

    /// Run a signal of actions for as long as this node keeps declaring it.
    pub fn subscribe<A>(&mut self, key: impl Into<String>, signal: &Signal<A>)
    where
        A: WorkflowAction<W> + Clone,
    {
        let key = key.into();
        self.await_result(SignalWorker::new(key.clone(), signal.clone()), key, |action| {
            action
        });
    }

    /// Render a child workflow and return its rendering.
    ///
    /// A child of the same type under the same key is kept: its state
    /// survives and `workflow_did_change` is called with the previous value.
    /// Children not rendered again by the end of the pass are torn down.
    pub fn render_child<C, A>(
        &mut self,
        child: C,
        key: impl Into<String>,
        on_output: impl Fn(C::Output) -> A + Send + 'static,
    ) -> C::Rendering
    where
        C: Workflow,
        A: WorkflowAction<W>,
    {
        let slot = self.slots.keys.next::<C>(key.into());
        let on_output = output_handler::<W, C::Output, A>(on_output);

        let previous = self
            .slots
            .previous_children
            .remove(&slot)
            .and_then(|p| p.into_any().downcast::<ChildNode<W, C>>().ok());

        let mut entry = match previous {
            Some(mut entry) => {
                entry.node.update_workflow(child);
                entry.on_output = on_output;
                entry
            }
            None => {
                let child_id = NodeId::new();
                debug!(node_id = %self.node_id, child_id = %child_id, slot = %slot, "Starting child");
                let dispatch =
                    child_dispatch::<W, C>(Arc::clone(self.dispatch), slot.clone(), child_id);
                Box::new(ChildNode {
                    node: WorkflowNode::new(child_id, child, dispatch, self.runtime.clone()),
                    on_output,
                })
            }
        };

        let rendering = entry.node.render();
        self.slots.children.insert(slot, entry);
        rendering
    }

    /// Read an always-available value through a [`PropertyWorkflow`] child.
    pub fn property_value<V>(&mut self, property: &Property<V>, key: impl Into<String>) -> V
    where
        V: Clone + Send + Sync + 'static,
    {
        self.render_child(
            PropertyWorkflow::new(property.clone()),
            key,
            |never: Infallible| -> AnyWorkflowAction<W> { match never {} },
        )
    }

    /// Forward a stream of actions into this node until `scope` ends.
    ///
    /// The forwarding task is spawned on the host's runtime and aborted when
    /// the lifetime ends; deliveries still queued at that point are dropped.
    pub fn observe<A, S>(&self, scope: &LifetimeToken, actions: S)
    where
        A: WorkflowAction<W>,
        S: Stream<Item = A> + Send + 'static,
    {
        let updates = actions.map(|action| action_update::<W, A>(action));
        spawn_forwarding(self.runtime, scope.clone(), updates, Arc::clone(self.dispatch));
    }

    fn start_worker<K: Worker>(
        &self,
        slot: &SlotKey,
        worker: K,
        on_output: OutputHandler<W, K::Output>,
    ) -> Box<WorkerSlot<W, K>> {
        debug!(node_id = %self.node_id, slot = %slot, "Starting worker");

        let lifetime = Lifetime::new();
        let updates = worker_updates::<W, K>(worker.run(), slot.clone());
        spawn_forwarding::<W, _>(
            self.runtime,
            lifetime.token(),
            updates,
            Arc::clone(self.dispatch),
        );

        Box::new(WorkerSlot {
            worker,
            lifetime,
            on_output,
        })
    }
}
