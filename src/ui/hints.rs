//! Container hints: typed configuration passed from a container to the views
//! it builds.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A key into [`ContainerHints`], carrying its value type and default.
pub trait ContainerHintKey: 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Value returned when the hint is unset.
    fn default_value() -> Self::Value;
}

/// Typed key/value bag. Unset keys read as their default.
#[derive(Clone, Default)]
pub struct ContainerHints {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ContainerHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a hint, falling back to the key's default.
    pub fn get<K: ContainerHintKey>(&self) -> K::Value {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|v| v.downcast_ref::<K::Value>())
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    /// Set a hint.
    pub fn set<K: ContainerHintKey>(&mut self, value: K::Value) {
        self.values.insert(TypeId::of::<K>(), Arc::new(value));
    }

    /// Copy of these hints with one hint set.
    pub fn setting<K: ContainerHintKey>(&self, value: K::Value) -> Self {
        let mut hints = self.clone();
        hints.set::<K>(value);
        hints
    }

    /// Whether `K` has been set explicitly.
    pub fn contains<K: ContainerHintKey>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<K>())
    }
}

impl fmt::Debug for ContainerHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHints")
            .field("len", &self.values.len())
            .finish()
    }
}
