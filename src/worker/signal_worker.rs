//! Worker over a hot signal.

use futures::stream::BoxStream;

use crate::reactive::Signal;
use crate::worker::Worker;

/// A worker that observes a [`Signal`] and forwards every value.
///
/// Two signal workers are equivalent when their keys are equal, regardless of
/// which signal they wrap.
#[derive(Clone)]
pub struct SignalWorker<K, V> {
    key: K,
    signal: Signal<V>,
}

impl<K, V> SignalWorker<K, V> {
    /// Create a worker for `signal`, identified by `key`.
    pub fn new(key: K, signal: Signal<V>) -> Self {
        Self { key, signal }
    }

    /// The equivalence key.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> Worker for SignalWorker<K, V>
where
    K: PartialEq + Send + 'static,
    V: Clone + Send + 'static,
{
    type Output = V;

    fn run(&self) -> BoxStream<'static, V> {
        self.signal.observe()
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
