//! Sinks: the channel through which asynchronous results re-enter a node.

use std::fmt;
use std::sync::Arc;

/// Fire-and-forget handle that delivers actions to the node that created it.
///
/// `send` may be called from any thread. Deliveries are queued on the host's
/// mailbox and applied one at a time, in send order. Sending to a node that
/// no longer exists is a no-op.
pub struct Sink<A> {
    deliver: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A: Send + 'static> Sink<A> {
    pub(crate) fn new(deliver: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Deliver an action.
    pub fn send(&self, action: A) {
        (self.deliver)(action);
    }

    /// Build a sink accepting `B`, converting each value with `f` before delivery.
    pub fn contramap<B: Send + 'static>(
        &self,
        f: impl Fn(B) -> A + Send + Sync + 'static,
    ) -> Sink<B> {
        let deliver = Arc::clone(&self.deliver);
        Sink::new(move |value| deliver(f(value)))
    }
}

impl<A> Clone for Sink<A> {
    fn clone(&self) -> Self {
        Self {
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<A> fmt::Debug for Sink<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("action", &std::any::type_name::<A>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn send_preserves_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&received);
        let sink = Sink::new(move |v: u32| r.lock().unwrap().push(v));

        for v in [1, 2, 3] {
            sink.send(v);
        }
        assert_eq!(*received.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn contramap_converts_before_delivery() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&received);
        let sink = Sink::new(move |v: String| r.lock().unwrap().push(v));
        let lengths = sink.contramap(|n: usize| "x".repeat(n));

        lengths.send(3);
        sink.clone().send("y".to_string());
        assert_eq!(*received.lock().unwrap(), vec!["xxx", "y"]);
    }

    #[test]
    fn send_from_other_threads() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&received);
        let sink = Sink::new(move |v: u32| r.lock().unwrap().push(v));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || sink.send(i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut got = received.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }
}
