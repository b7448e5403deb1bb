//! Properties: values that always exist and may change.

use std::fmt;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

/// Read-only view of a value that is always available.
pub struct Property<V> {
    id: Uuid,
    rx: watch::Receiver<V>,
}

impl<V: Clone + Send + Sync + 'static> Property<V> {
    /// A property that never changes.
    pub fn constant(value: V) -> Self {
        let (tx, rx) = watch::channel(value);
        // Dropping the sender completes `changes` immediately.
        drop(tx);
        Self {
            id: Uuid::new_v4(),
            rx,
        }
    }

    /// The current value.
    pub fn value(&self) -> V {
        self.rx.borrow().clone()
    }

    /// Values set after this call.
    ///
    /// Intermediate values may be coalesced; the latest one is always seen.
    pub fn changes(&self) -> BoxStream<'static, V> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        WatchStream::from_changes(rx).boxed()
    }

    /// Changes not yet seen by this handle, including any set since it was
    /// created. May repeat the value already read through [`value`](Self::value).
    pub(crate) fn unseen_changes(&self) -> BoxStream<'static, V> {
        WatchStream::from_changes(self.rx.clone()).boxed()
    }
}

impl<V> Property<V> {
    /// Whether both handles observe the same value cell.
    pub fn same_property(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Clone for Property<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rx: self.rx.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Property<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("value", &*self.rx.borrow())
            .finish()
    }
}

/// Owner side of a [`Property`].
pub struct MutableProperty<V> {
    id: Uuid,
    tx: watch::Sender<V>,
}

impl<V: Clone + Send + Sync + 'static> MutableProperty<V> {
    /// Create a property holding `value`.
    pub fn new(value: V) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx: watch::Sender::new(value),
        }
    }

    /// The current value.
    pub fn value(&self) -> V {
        self.tx.borrow().clone()
    }

    /// Replace the value, notifying observers. Returns the old value.
    pub fn set(&self, value: V) -> V {
        self.tx.send_replace(value)
    }

    /// Modify the value in place, notifying observers.
    pub fn modify(&self, f: impl FnOnce(&mut V)) {
        self.tx.send_modify(f);
    }

    /// A read-only view sharing this property's identity.
    pub fn property(&self) -> Property<V> {
        Property {
            id: self.id,
            rx: self.tx.subscribe(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for MutableProperty<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableProperty")
            .field("id", &self.id)
            .field("value", &*self.tx.borrow())
            .finish()
    }
}
