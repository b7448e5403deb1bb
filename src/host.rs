//! Workflow host: owns the root node and applies deliveries one at a time.
//!
//! Every sink, worker and adapter sends its state changes into one mailbox.
//! The host drains it serially: apply the change, then re-render the tree.
//! Renders therefore never overlap and never race with a state change.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::config::HostConfig;
use crate::error::{Result, RuntimeError};
use crate::lifetime::LifetimeToken;
use crate::render::SlotKey;
use crate::render::node::{Delivery, NodeId, WorkflowNode};
use crate::workflow::Workflow;

/// What processing one delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent<O> {
    /// State was updated and the tree re-rendered.
    Rendered,
    /// The root produced an output; the tree was re-rendered as well.
    Output(O),
    /// The delivery's lifetime had ended; nothing changed.
    Discarded,
}

/// Runs a workflow tree.
pub struct WorkflowHost<W: Workflow> {
    config: HostConfig,
    root: WorkflowNode<W>,
    sender: mpsc::UnboundedSender<Delivery<W>>,
    mailbox: mpsc::UnboundedReceiver<Delivery<W>>,
    rendering: W::Rendering,
}

impl<W: Workflow> WorkflowHost<W> {
    /// Create the root node and perform the initial render.
    ///
    /// Must be called from within a tokio runtime; workers are spawned on it.
    pub fn new(workflow: W, config: HostConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| RuntimeError::NoRuntime {
            name: config.name.clone(),
        })?;

        let (sender, mailbox) = mpsc::unbounded_channel::<Delivery<W>>();
        let tx = sender.clone();
        let dispatch = Arc::new(move |delivery: Delivery<W>| {
            if tx.send(delivery).is_err() {
                trace!("Host mailbox closed, dropping delivery");
            }
        });

        let mut root = WorkflowNode::new(NodeId::new(), workflow, dispatch, runtime);
        let rendering = root.render();

        info!(host = %config.name, root = %root.id, "Workflow host started");

        Ok(Self {
            config,
            root,
            sender,
            mailbox,
            rendering,
        })
    }

    /// The latest rendering.
    pub fn rendering(&self) -> &W::Rendering {
        &self.rendering
    }

    /// Configuration the host was started with.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Wait for the next delivery, apply it and re-render.
    ///
    /// The host holds a sender of its own mailbox, so while the host is alive
    /// the mailbox stays open: this waits for the next delivery and does not
    /// return `None`.
    pub async fn process_next(&mut self) -> Option<HostEvent<W::Output>> {
        let delivery = self.mailbox.recv().await?;
        Some(self.apply(delivery))
    }

    /// Apply the next delivery if one is already queued.
    pub fn try_process(&mut self) -> Option<HostEvent<W::Output>> {
        let delivery = self.mailbox.try_recv().ok()?;
        Some(self.apply(delivery))
    }

    /// Replace the root workflow and re-render.
    pub fn update(&mut self, workflow: W) {
        self.root.update_workflow(workflow);
        self.rendering = self.root.render();
    }

    /// Tear down the whole tree.
    pub fn shutdown(self) {
        drop(self);
    }

    /// Workers currently declared by the root node.
    pub fn worker_count(&self) -> usize {
        self.root.worker_count()
    }

    /// Children currently rendered by the root node.
    pub fn child_count(&self) -> usize {
        self.root.child_count()
    }

    /// Lifetimes of the root node's running workers, ordered by slot.
    pub fn worker_lifetimes(&self) -> Vec<(SlotKey, LifetimeToken)> {
        self.root.worker_lifetimes()
    }

    fn apply(&mut self, delivery: Delivery<W>) -> HostEvent<W::Output> {
        if delivery.is_stale() {
            trace!(host = %self.config.name, "Discarding delivery from ended lifetime");
            return HostEvent::Discarded;
        }

        let output = (delivery.update)(&mut self.root);
        self.rendering = self.root.render();

        match output {
            Some(output) => HostEvent::Output(output),
            None => HostEvent::Rendered,
        }
    }
}

impl<W> WorkflowHost<W>
where
    W: Workflow,
    W::Rendering: Clone + Send + Sync + 'static,
{
    /// Run the host on its own task.
    ///
    /// Renderings are published on a watch channel and root outputs on an
    /// unbounded channel.
    pub fn spawn(self) -> HostHandle<W> {
        let name = self.config.name.clone();
        let sender = self.sender.clone();
        let (rendering_tx, renderings) = watch::channel(self.rendering.clone());
        let (output_tx, outputs) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_host(self, rendering_tx, output_tx, cancel.clone()));

        HostHandle {
            name,
            sender,
            renderings,
            outputs,
            cancel,
            task: Some(task),
        }
    }
}

async fn run_host<W>(
    mut host: WorkflowHost<W>,
    renderings: watch::Sender<W::Rendering>,
    outputs: mpsc::UnboundedSender<W::Output>,
    cancel: CancellationToken,
) where
    W: Workflow,
    W::Rendering: Clone + Send + Sync + 'static,
{
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = host.process_next() => event,
        };

        match event {
            Some(HostEvent::Rendered) => {
                renderings.send_replace(host.rendering().clone());
            }
            Some(HostEvent::Output(output)) => {
                renderings.send_replace(host.rendering().clone());
                if outputs.send(output).is_err() {
                    debug!(host = %host.config.name, "Output receiver dropped");
                }
            }
            Some(HostEvent::Discarded) => {}
            None => break,
        }
    }
}

/// Handle to a host running on its own task.
///
/// Dropping the handle stops the host and tears down the tree.
pub struct HostHandle<W: Workflow> {
    name: String,
    sender: mpsc::UnboundedSender<Delivery<W>>,
    renderings: watch::Receiver<W::Rendering>,
    outputs: mpsc::UnboundedReceiver<W::Output>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<W> HostHandle<W>
where
    W: Workflow,
    W::Rendering: Clone,
{
    /// A receiver of every published rendering.
    pub fn renderings(&self) -> watch::Receiver<W::Rendering> {
        self.renderings.clone()
    }

    /// The latest published rendering.
    pub fn rendering(&self) -> W::Rendering {
        self.renderings.borrow().clone()
    }

    /// Wait for the next root output. `None` once the host has stopped.
    pub async fn next_output(&mut self) -> Option<W::Output> {
        self.outputs.recv().await
    }

    /// Replace the root workflow. Applied in order with other deliveries.
    pub fn update(&self, workflow: W) -> Result<()> {
        let delivery = Delivery {
            scope: None,
            update: Box::new(move |node: &mut WorkflowNode<W>| {
                node.update_workflow(workflow);
                None
            }),
        };
        self.sender.send(delivery).map_err(|_| RuntimeError::HostStopped {
            name: self.name.clone(),
        })?;
        Ok(())
    }

    /// Stop the host and wait until the tree is torn down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(host = %self.name, error = %e, "Host task ended abnormally");
            }
        }
    }
}

impl<W: Workflow> Drop for HostHandle<W> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<W: Workflow> Drop for WorkflowHost<W> {
    fn drop(&mut self) {
        self.root.teardown();
        info!(host = %self.config.name, "Workflow host stopped");
    }
}
