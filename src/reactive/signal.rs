//! Hot signals over a broadcast channel.

use std::fmt;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 64;

/// A hot stream of values.
///
/// Observers only see values sent after they subscribed. Clones share the
/// same channel.
pub struct Signal<V> {
    id: Uuid,
    tx: broadcast::Sender<V>,
}

impl<V: Clone + Send + 'static> Signal<V> {
    /// Create a signal with the default buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a signal buffering up to `capacity` values per slow observer.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    /// Send a value to every current observer. Returns how many received it.
    pub fn send(&self, value: V) -> usize {
        self.tx.send(value).unwrap_or(0)
    }

    /// Observe values sent from now on.
    ///
    /// The receiver is registered before this returns, so nothing sent after
    /// the call is missed. A lagging observer skips the overwritten values.
    pub fn observe(&self) -> BoxStream<'static, V> {
        let id = self.id;
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(move |item| async move {
                match item {
                    Ok(value) => Some(value),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(signal = %id, skipped, "Signal observer lagged");
                        None
                    }
                }
            })
            .boxed()
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<V> Signal<V> {
    /// Whether both handles refer to the same signal.
    pub fn same_signal(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V: Clone + Send + 'static> Default for Signal<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Signal<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<V> fmt::Debug for Signal<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("observers", &self.tx.receiver_count())
            .finish()
    }
}
