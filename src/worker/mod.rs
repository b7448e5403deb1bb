//! Workers: declarative asynchronous tasks.
//!
//! - `worker` is the [`Worker`] trait, run plus equivalence
//! - `signal_worker` is [`SignalWorker`], a keyed worker over a hot signal
//! - `slot` is the running-slot record kept by a node between render passes

pub mod signal_worker;
pub(crate) mod slot;
#[allow(clippy::module_inception)]
pub mod worker;

pub use signal_worker::SignalWorker;
pub use worker::Worker;
