//! The worker contract.

use futures::stream::BoxStream;

/// Declarative description of an asynchronous task.
///
/// A render pass declares workers through
/// [`RenderContext::await_result`](crate::RenderContext::await_result). If the
/// previous pass declared an equivalent worker in the same slot, the running
/// task is left alone; otherwise the old task is cancelled and `run` is called
/// on the new declaration.
///
/// Workers cannot fail. Map failures into `Output` values before they reach
/// the sink.
pub trait Worker: Send + 'static {
    /// Values emitted by the running task.
    type Output: Send + 'static;

    /// Start the work. Called once per started slot.
    fn run(&self) -> BoxStream<'static, Self::Output>;

    /// Whether `other` describes the same logical task as `self`.
    ///
    /// Take into account whatever data is meaningful to the task: a worker
    /// loading an account is not equivalent to one loading a different account.
    fn is_equivalent(&self, other: &Self) -> bool;
}
