//! Cold, restartable producers.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use uuid::Uuid;

type StartFn<V> = Arc<dyn Fn() -> BoxStream<'static, V> + Send + Sync>;

/// A factory for a fresh stream each time it is started.
///
/// Nothing runs until [`start`](SignalProducer::start) is called. Clones share
/// the factory and are considered the same producer.
pub struct SignalProducer<V> {
    id: Uuid,
    start: StartFn<V>,
}

impl<V: Send + 'static> SignalProducer<V> {
    /// Create a producer from a stream factory.
    pub fn new<S, F>(start: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = V> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            start: Arc::new(move || start().boxed()),
        }
    }

    /// Producer emitting a clone of each value, then completing.
    pub fn from_values(values: Vec<V>) -> Self
    where
        V: Clone + Sync,
    {
        Self::new(move || stream::iter(values.clone()))
    }

    /// Producer emitting a single value.
    pub fn once(value: V) -> Self
    where
        V: Clone + Sync,
    {
        Self::from_values(vec![value])
    }

    /// Start a new run of the producer.
    pub fn start(&self) -> BoxStream<'static, V> {
        (self.start)()
    }
}

impl<V> SignalProducer<V> {
    /// Whether both handles refer to the same producer.
    pub fn same_producer(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Clone for SignalProducer<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            start: Arc::clone(&self.start),
        }
    }
}

impl<V> fmt::Debug for SignalProducer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalProducer")
            .field("id", &self.id)
            .finish()
    }
}
