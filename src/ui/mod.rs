//! Boundary with the presentation layer.

pub mod description;
pub mod hints;

pub use description::ViewDescription;
pub use hints::{ContainerHintKey, ContainerHints};
