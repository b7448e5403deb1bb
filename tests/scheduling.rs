//! Integration tests for worker scheduling across render passes.
//!
//! Each test hosts a small workflow tree, drives it through a few renders,
//! and checks which tasks were started, kept or cancelled.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Probe, Screen, Start, drain, host, next_event, settle};
use workflow_core::{AnyWorkflowAction, HostEvent, RenderContext, Sink, Workflow};

fn count_ends(token: &workflow_core::LifetimeToken) -> Arc<AtomicUsize> {
    let ends = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&ends);
    token.on_end(move || {
        counted.fetch_add(1, Ordering::SeqCst);
    });
    ends
}

// ── Equivalence ─────────────────────────────────────────────────────

#[tokio::test]
async fn equivalent_worker_keeps_its_lifetime() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    let (_, first) = host.worker_lifetimes().remove(0);

    // Render 2: same id, different payload.
    host.update(Screen::new(vec![(1, "b")], &probe));
    let (_, second) = host.worker_lifetimes().remove(0);

    assert_eq!(first.id(), second.id());
    assert!(!first.is_ended());
    assert_eq!(probe.starts().len(), 1);

    // Outputs go through the latest declaration's handler.
    settle().await;
    probe.source.send(5);
    assert_eq!(next_event(&mut host).await, HostEvent::Rendered);
    assert_eq!(host.rendering(), &vec!["1:b:5".to_string()]);
}

#[tokio::test]
async fn render_one_two_three() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    let (_, render_one) = host.worker_lifetimes().remove(0);
    let ends = count_ends(&render_one);

    host.update(Screen::new(vec![(1, "a")], &probe));
    let (_, render_two) = host.worker_lifetimes().remove(0);
    assert_eq!(render_one.id(), render_two.id());
    assert_eq!(ends.load(Ordering::SeqCst), 0);

    host.update(Screen::new(vec![(2, "a")], &probe));
    let (_, render_three) = host.worker_lifetimes().remove(0);
    assert!(render_one.is_ended());
    assert_ne!(render_one.id(), render_three.id());
    assert!(!render_three.is_ended());
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert_eq!(probe.starts().len(), 2);
}

// ── Replacement and removal ─────────────────────────────────────────

#[tokio::test]
async fn replacement_ends_previous_exactly_once_before_start() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    let (_, previous) = host.worker_lifetimes().remove(0);
    let ends = count_ends(&previous);
    probe.watch(previous.clone());

    host.update(Screen::new(vec![(2, "a")], &probe));

    assert_eq!(
        probe.starts(),
        vec![
            Start {
                id: 1,
                label: "a",
                watched_ended: None,
            },
            Start {
                id: 2,
                label: "a",
                watched_ended: Some(true),
            },
        ]
    );
    assert_eq!(ends.load(Ordering::SeqCst), 1);

    // Further renders and teardown never end it again.
    host.update(Screen::new(vec![(3, "a")], &probe));
    host.shutdown();
    assert_eq!(ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropped_declaration_cancels_once_and_starts_nothing() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    let (_, running) = host.worker_lifetimes().remove(0);
    let ends = count_ends(&running);

    host.update(Screen::new(vec![], &probe));

    assert!(running.is_ended());
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert_eq!(probe.starts().len(), 1);
    assert_eq!(host.worker_count(), 0);

    host.update(Screen::new(vec![], &probe));
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert_eq!(probe.starts().len(), 1);
}

#[tokio::test]
async fn no_deliveries_after_lifetime_ends() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    settle().await;

    probe.source.send(1);
    assert_eq!(next_event(&mut host).await, HostEvent::Rendered);

    // Queued, but not yet applied, when the worker is stopped.
    probe.source.send(2);
    settle().await;
    host.update(Screen::new(vec![], &probe));

    // The source keeps emitting after cancellation.
    for value in 3..10 {
        probe.source.send(value);
    }
    settle().await;

    let events = drain(&mut host);
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| *e == HostEvent::Discarded));
    assert_eq!(host.rendering(), &vec!["1:a:1".to_string()]);
    assert_eq!(probe.source.observer_count(), 0);
}

#[tokio::test]
async fn stopped_worker_unsubscribes_before_update_returns() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));
    assert_eq!(probe.source.observer_count(), 1);
    let (_, running) = host.worker_lifetimes().remove(0);

    host.update(Screen::new(vec![], &probe));

    assert!(running.is_ended());
    assert_eq!(probe.source.observer_count(), 0);
    assert_eq!(probe.source.send(1), 0);
}

#[tokio::test]
async fn replaced_worker_unsubscribes_before_update_returns() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a")], &probe));

    host.update(Screen::new(vec![(2, "a")], &probe));

    // Only the replacement is still listening.
    assert_eq!(probe.source.observer_count(), 1);
    probe.source.send(4);
    assert_eq!(next_event(&mut host).await, HostEvent::Rendered);
    assert_eq!(host.rendering(), &vec!["2:a:4".to_string()]);
    assert!(drain(&mut host).is_empty());
}

// ── Slot identity ───────────────────────────────────────────────────

#[tokio::test]
async fn repeated_key_declares_independent_slots() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a"), (2, "b")], &probe));
    assert_eq!(host.worker_count(), 2);

    let slots = host.worker_lifetimes();
    assert_eq!(slots[0].0.ordinal(), 0);
    assert_eq!(slots[1].0.ordinal(), 1);

    host.update(Screen::new(vec![(1, "a"), (2, "b")], &probe));
    assert_eq!(probe.starts().len(), 2);

    settle().await;
    probe.source.send(7);
    next_event(&mut host).await;
    next_event(&mut host).await;

    let mut received = host.rendering().clone();
    received.sort();
    assert_eq!(received, vec!["1:a:7".to_string(), "2:b:7".to_string()]);
}

#[tokio::test]
async fn repeated_key_slots_match_by_declaration_order() {
    let probe = Probe::default();
    let mut host = host(Screen::new(vec![(1, "a"), (2, "b")], &probe));
    let before: Vec<_> = host.worker_lifetimes().into_iter().map(|(_, t)| t).collect();

    // Same workers, swapped order: each ordinal now holds a different id.
    host.update(Screen::new(vec![(2, "b"), (1, "a")], &probe));

    assert!(before.iter().all(|t| t.is_ended()));
    assert_eq!(probe.starts().len(), 4);
    assert_eq!(host.worker_count(), 2);
}

// ── Children ────────────────────────────────────────────────────────

/// Child that runs a [`Feed`](common::Feed) and exposes a sink into itself.
struct Inbox {
    probe: Probe,
}

#[derive(Clone, Debug)]
struct InboxRendering {
    received: Vec<String>,
    sink: Sink<AnyWorkflowAction<Inbox>>,
}

impl Workflow for Inbox {
    type State = Vec<String>;
    type Output = String;
    type Rendering = InboxRendering;
    type Storage = ();

    fn make_initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, state: &Vec<String>, context: &mut RenderContext<'_, Self>) -> InboxRendering {
        let feed = common::Feed {
            id: 1,
            label: "inbox",
            probe: self.probe.clone(),
        };
        context.await_result(feed, "feed", |value| {
            AnyWorkflowAction::new(move |received: &mut Vec<String>| {
                received.push(value.to_string());
                None
            })
        });

        InboxRendering {
            received: state.clone(),
            sink: context.make_sink(),
        }
    }
}

/// Renders an [`Inbox`] while `show` is set; records the inbox's outputs.
struct Parent {
    show: bool,
    probe: Probe,
}

impl Workflow for Parent {
    type State = Vec<String>;
    type Output = String;
    type Rendering = Option<InboxRendering>;
    type Storage = ();

    fn make_initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn render(
        &self,
        _state: &Vec<String>,
        context: &mut RenderContext<'_, Self>,
    ) -> Option<InboxRendering> {
        if !self.show {
            return None;
        }

        let inbox = Inbox {
            probe: self.probe.clone(),
        };
        Some(context.render_child(inbox, "inbox", |message: String| {
            AnyWorkflowAction::new(move |log: &mut Vec<String>| {
                log.push(message.clone());
                Some(message)
            })
        }))
    }
}

fn push(text: &'static str) -> AnyWorkflowAction<Inbox> {
    AnyWorkflowAction::new(move |received: &mut Vec<String>| {
        received.push(text.to_string());
        None
    })
}

#[tokio::test]
async fn child_state_and_output_reach_parent() {
    let probe = Probe::default();
    let mut host = host(Parent {
        show: true,
        probe: probe.clone(),
    });
    assert_eq!(host.child_count(), 1);

    let sink = host.rendering().as_ref().unwrap().sink.clone();
    sink.send(push("hello"));
    assert_eq!(next_event(&mut host).await, HostEvent::Rendered);
    assert_eq!(host.rendering().as_ref().unwrap().received, vec!["hello"]);

    settle().await;
    probe.source.send(3);
    assert_eq!(next_event(&mut host).await, HostEvent::Rendered);
    assert_eq!(
        host.rendering().as_ref().unwrap().received,
        vec!["hello", "3"]
    );

    sink.send(AnyWorkflowAction::sending_output("done".to_string()));
    assert_eq!(
        next_event(&mut host).await,
        HostEvent::Output("done".to_string())
    );

    // Re-rendering the parent keeps the child and its worker.
    host.update(Parent {
        show: true,
        probe: probe.clone(),
    });
    assert_eq!(probe.starts().len(), 1);
    assert_eq!(host.rendering().as_ref().unwrap().received.len(), 2);
}

#[tokio::test]
async fn removed_child_tears_down_and_ignores_stale_sink() {
    let probe = Probe::default();
    let mut host = host(Parent {
        show: true,
        probe: probe.clone(),
    });
    let stale = host.rendering().as_ref().unwrap().sink.clone();
    settle().await;
    assert_eq!(probe.source.observer_count(), 1);

    host.update(Parent {
        show: false,
        probe: probe.clone(),
    });
    assert_eq!(host.child_count(), 0);
    assert_eq!(probe.source.observer_count(), 0);

    stale.send(push("late"));
    next_event(&mut host).await;
    assert!(host.rendering().is_none());

    // A new child under the same key starts fresh; the old sink still goes nowhere.
    host.update(Parent {
        show: true,
        probe: probe.clone(),
    });
    assert_eq!(probe.starts().len(), 2);
    stale.send(push("later"));
    next_event(&mut host).await;
    assert!(host.rendering().as_ref().unwrap().received.is_empty());

    let fresh = host.rendering().as_ref().unwrap().sink.clone();
    fresh.send(push("fresh"));
    next_event(&mut host).await;
    assert_eq!(host.rendering().as_ref().unwrap().received, vec!["fresh"]);
}
