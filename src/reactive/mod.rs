//! Reactive sources and the workflows that adapt them.
//!
//! Core components:
//! - `signal` is a hot stream over a broadcast channel
//! - `producer` is a cold factory started once per subscription
//! - `property` is a value that always exists and may change
//! - `adapters` wraps each source in a schedulable workflow

pub mod adapters;
pub mod producer;
pub mod property;
pub mod signal;

pub use adapters::{ProducerWorkflow, PropertyWorkflow, SignalWorkflow, Subscription};
pub use producer::SignalProducer;
pub use property::{MutableProperty, Property};
pub use signal::Signal;
