//! Workflow Core: a declarative scheduler for asynchronous work.
//!
//! A tree of workflows is re-rendered after every state change. Each render
//! declares the workers and children the node wants running; the render
//! context diffs those declarations against the previous pass and starts,
//! keeps or cancels the underlying tasks accordingly.

pub mod action;
pub mod config;
pub mod error;
pub mod host;
pub mod lifetime;
pub mod reactive;
pub mod render;
pub mod sink;
pub mod ui;
pub mod worker;
pub mod workflow;

pub use action::{AnyWorkflowAction, WorkflowAction};
pub use config::HostConfig;
pub use error::{Error, Result};
pub use host::{HostEvent, HostHandle, WorkflowHost};
pub use lifetime::{Lifetime, LifetimeToken};
pub use render::{RenderContext, SlotChange};
pub use sink::Sink;
pub use worker::Worker;
pub use workflow::{IntoWorkflow, Workflow};
