//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::BoxStream;
use tokio::time::timeout;

use workflow_core::reactive::Signal;
use workflow_core::{
    AnyWorkflowAction, HostConfig, HostEvent, LifetimeToken, RenderContext, Worker, Workflow,
    WorkflowHost,
};

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Let spawned forwarding tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Wait for the host to apply the next delivery.
pub async fn next_event<W: Workflow>(host: &mut WorkflowHost<W>) -> HostEvent<W::Output> {
    timeout(TEST_TIMEOUT, host.process_next())
        .await
        .expect("test timed out")
        .expect("mailbox closed")
}

/// Apply everything already queued.
pub fn drain<W: Workflow>(host: &mut WorkflowHost<W>) -> Vec<HostEvent<W::Output>> {
    std::iter::from_fn(|| host.try_process()).collect()
}

pub fn host<W: Workflow>(workflow: W) -> WorkflowHost<W> {
    WorkflowHost::new(workflow, HostConfig::named("test")).expect("host should start")
}

/// One call to [`Feed::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Start {
    pub id: u32,
    pub label: &'static str,
    /// Whether the watched lifetime had already ended when this run began.
    pub watched_ended: Option<bool>,
}

/// Records starts, and lets a test watch one lifetime from inside `run`.
#[derive(Clone, Default)]
pub struct Probe {
    pub source: Signal<u32>,
    pub starts: Arc<Mutex<Vec<Start>>>,
    pub watched: Arc<Mutex<Option<LifetimeToken>>>,
}

impl Probe {
    pub fn starts(&self) -> Vec<Start> {
        self.starts.lock().unwrap().clone()
    }

    pub fn watch(&self, token: LifetimeToken) {
        *self.watched.lock().unwrap() = Some(token);
    }
}

/// A worker forwarding every value of the probe's source. Equivalent by id.
pub struct Feed {
    pub id: u32,
    pub label: &'static str,
    pub probe: Probe,
}

impl Worker for Feed {
    type Output = u32;

    fn run(&self) -> BoxStream<'static, u32> {
        let watched_ended = self
            .probe
            .watched
            .lock()
            .unwrap()
            .as_ref()
            .map(LifetimeToken::is_ended);
        self.probe.starts.lock().unwrap().push(Start {
            id: self.id,
            label: self.label,
            watched_ended,
        });
        self.probe.source.observe()
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Declares one [`Feed`] per entry, all under the key `"feed"`.
///
/// Each value received is recorded as `"{id}:{label}:{value}"`, using the
/// label of the latest declaration.
pub struct Screen {
    pub feeds: Vec<(u32, &'static str)>,
    pub probe: Probe,
}

impl Screen {
    pub fn new(feeds: Vec<(u32, &'static str)>, probe: &Probe) -> Self {
        Self {
            feeds,
            probe: probe.clone(),
        }
    }
}

impl Workflow for Screen {
    type State = Vec<String>;
    type Output = ();
    type Rendering = Vec<String>;
    type Storage = ();

    fn make_initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, state: &Vec<String>, context: &mut RenderContext<'_, Self>) -> Vec<String> {
        for &(id, label) in &self.feeds {
            let feed = Feed {
                id,
                label,
                probe: self.probe.clone(),
            };
            context.await_result(feed, "feed", move |value| {
                AnyWorkflowAction::new(move |received: &mut Vec<String>| {
                    received.push(format!("{id}:{label}:{value}"));
                    None
                })
            });
        }
        state.clone()
    }
}
