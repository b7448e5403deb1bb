//! Task diff engine: compares one declaration slot across two render passes.
//!
//! The engine is pure: it only decides what must happen to a slot. The render
//! context applies the decision (allocating or ending lifetimes).

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// What happens to a declaration slot between two render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Nothing was running; start the current declaration.
    Start,
    /// The declarations are equivalent; keep the running task untouched.
    Continue,
    /// The declarations differ; end the previous task, then start the current one.
    Replace,
    /// The slot is no longer declared; end the previous task.
    Stop,
    /// Neither pass declared the slot.
    Idle,
}

impl SlotChange {
    /// Whether the previous task's lifetime must end.
    pub fn ends_previous(self) -> bool {
        matches!(self, Self::Replace | Self::Stop)
    }

    /// Whether a new task must be started.
    pub fn starts_current(self) -> bool {
        matches!(self, Self::Start | Self::Replace)
    }
}

impl fmt::Display for SlotChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Replace => "replace",
            Self::Stop => "stop",
            Self::Idle => "idle",
        };
        write!(f, "{s}")
    }
}

/// Decide what happens to one slot given its previous and current declaration.
///
/// `is_equivalent` is only invoked when both sides are present, so it never
/// sees declarations of different kinds.
pub fn diff_slot<D: ?Sized>(
    previous: Option<&D>,
    current: Option<&D>,
    is_equivalent: impl FnOnce(&D, &D) -> bool,
) -> SlotChange {
    match (previous, current) {
        (None, None) => SlotChange::Idle,
        (None, Some(_)) => SlotChange::Start,
        (Some(_), None) => SlotChange::Stop,
        (Some(p), Some(c)) if is_equivalent(p, c) => SlotChange::Continue,
        (Some(_), Some(_)) => SlotChange::Replace,
    }
}

/// Identity of a declaration slot within one node.
///
/// A slot is the declaration's concrete kind, the caller's key, and the
/// ordinal of that `(kind, key)` pair within the render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    kind: TypeId,
    kind_name: &'static str,
    key: String,
    ordinal: usize,
}

impl SlotKey {
    /// Caller-supplied key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Position among same-kind, same-key declarations in one pass.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Type name of the declared kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?}#{}]", self.kind_name, self.key, self.ordinal)
    }
}

/// Hands out slot keys for one render pass.
#[derive(Debug, Default)]
pub(crate) struct SlotKeys {
    ordinals: HashMap<(TypeId, String), usize>,
}

impl SlotKeys {
    /// Forget the ordinals of the previous pass.
    pub(crate) fn reset(&mut self) {
        self.ordinals.clear();
    }

    /// Next key for a declaration of kind `T` with the given caller key.
    pub(crate) fn next<T: 'static>(&mut self, key: String) -> SlotKey {
        let kind = TypeId::of::<T>();
        let counter = self.ordinals.entry((kind, key.clone())).or_insert(0);
        let ordinal = *counter;
        *counter += 1;

        SlotKey {
            kind,
            kind_name: std::any::type_name::<T>(),
            key,
            ordinal,
        }
    }
}
