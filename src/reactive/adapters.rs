//! Workflows wrapping reactive sources.
//!
//! Each adapter keeps its active subscription in node storage. Re-rendering
//! with the same source keeps it; a different source ends the old
//! subscription before the new one starts.

use std::convert::Infallible;

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::action::AnyWorkflowAction;
use crate::lifetime::Lifetime;
use crate::reactive::{Property, Signal, SignalProducer};
use crate::render::{RenderContext, diff_slot};
use crate::workflow::{IntoWorkflow, Workflow};

/// An active subscription to `source`, alive until its lifetime ends.
#[derive(Debug)]
pub struct Subscription<S> {
    source: S,
    lifetime: Lifetime,
}

impl<S> Subscription<S> {
    /// The subscribed source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The subscription's lifetime.
    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }
}

/// Keep, replace or start the subscription stored in `context`.
fn resubscribe<W, S, St>(
    context: &mut RenderContext<'_, W>,
    source: &S,
    same_source: impl FnOnce(&S, &S) -> bool,
    start: impl FnOnce(&S) -> St,
) where
    W: Workflow<Storage = Option<Subscription<S>>>,
    S: Clone + Send + 'static,
    St: Stream<Item = AnyWorkflowAction<W>> + Send + 'static,
{
    let previous = context.storage().as_ref().map(|s| &s.source);
    let change = diff_slot(previous, Some(source), same_source);

    if change.ends_previous() {
        if let Some(previous) = context.storage_mut().take() {
            debug!(node_id = %context.node_id(), lifetime = %previous.lifetime.id(), "Source changed, ending subscription");
            previous.lifetime.end();
        }
    }

    if change.starts_current() {
        let lifetime = Lifetime::new();
        context.observe(&lifetime.token(), start(source));
        *context.storage_mut() = Some(Subscription {
            source: source.clone(),
            lifetime,
        });
    }
}

// ── Single-shot stream ──────────────────────────────────────────────

/// Runs a [`SignalProducer`] once and reports each value as an output.
#[derive(Debug, Clone)]
pub struct ProducerWorkflow<V> {
    producer: SignalProducer<V>,
}

impl<V> ProducerWorkflow<V> {
    pub fn new(producer: SignalProducer<V>) -> Self {
        Self { producer }
    }
}

impl<V: Send + 'static> Workflow for ProducerWorkflow<V> {
    type State = ();
    type Output = V;
    type Rendering = ();
    type Storage = Option<Subscription<SignalProducer<V>>>;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) {
        resubscribe(
            context,
            &self.producer,
            SignalProducer::same_producer,
            |producer| producer.start().map(AnyWorkflowAction::sending_output),
        );
    }
}

impl<V: Send + 'static> IntoWorkflow for SignalProducer<V> {
    type Workflow = ProducerWorkflow<V>;

    fn into_workflow(self) -> ProducerWorkflow<V> {
        ProducerWorkflow::new(self)
    }
}

// ── Continuous stream ───────────────────────────────────────────────

/// Forwards every value of a hot [`Signal`] as an output.
#[derive(Debug, Clone)]
pub struct SignalWorkflow<V> {
    signal: Signal<V>,
}

impl<V> SignalWorkflow<V> {
    pub fn new(signal: Signal<V>) -> Self {
        Self { signal }
    }
}

impl<V: Clone + Send + 'static> Workflow for SignalWorkflow<V> {
    type State = ();
    type Output = V;
    type Rendering = ();
    type Storage = Option<Subscription<Signal<V>>>;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) {
        resubscribe(context, &self.signal, Signal::same_signal, |signal| {
            signal.observe().map(AnyWorkflowAction::sending_output)
        });
    }
}

impl<V: Clone + Send + 'static> IntoWorkflow for Signal<V> {
    type Workflow = SignalWorkflow<V>;

    fn into_workflow(self) -> SignalWorkflow<V> {
        SignalWorkflow::new(self)
    }
}

// ── Always-available value ──────────────────────────────────────────

/// Renders the current value of a [`Property`].
///
/// The initial value is read synchronously, so the first render already has
/// it. Changes overwrite the state and never produce an output.
#[derive(Debug, Clone)]
pub struct PropertyWorkflow<V> {
    property: Property<V>,
}

impl<V> PropertyWorkflow<V> {
    pub fn new(property: Property<V>) -> Self {
        Self { property }
    }
}

impl<V: Clone + Send + Sync + 'static> Workflow for PropertyWorkflow<V> {
    type State = V;
    type Output = Infallible;
    type Rendering = V;
    type Storage = Option<Subscription<Property<V>>>;

    fn make_initial_state(&self) -> V {
        self.property.value()
    }

    fn workflow_did_change(&self, previous: &Self, state: &mut V) {
        if !self.property.same_property(&previous.property) {
            *state = self.property.value();
        }
    }

    fn render(&self, state: &V, context: &mut RenderContext<'_, Self>) -> V {
        resubscribe(context, &self.property, Property::same_property, |property| {
            property.unseen_changes().map(|value| {
                AnyWorkflowAction::new(move |state: &mut V| {
                    *state = value;
                    None
                })
            })
        });
        state.clone()
    }
}

impl<V: Clone + Send + Sync + 'static> IntoWorkflow for Property<V> {
    type Workflow = PropertyWorkflow<V>;

    fn into_workflow(self) -> PropertyWorkflow<V> {
        PropertyWorkflow::new(self)
    }
}
