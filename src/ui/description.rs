//! View descriptions: how a rendering is turned into a platform view.
//!
//! The core never looks inside a view. A description only knows the concrete
//! view type it builds, how to build one, and how to apply itself to an
//! existing one.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::BindingError;
use crate::ui::ContainerHints;

type BuildFn = Arc<dyn Fn(&ContainerHints) -> Box<dyn Any + Send> + Send + Sync>;
type UpdateFn =
    Arc<dyn Fn(&mut dyn Any, &ContainerHints) -> Result<(), BindingError> + Send + Sync>;

/// Builds and updates views of one concrete type.
#[derive(Clone)]
pub struct ViewDescription {
    kind: TypeId,
    kind_name: &'static str,
    build: BuildFn,
    update: UpdateFn,
}

impl ViewDescription {
    /// Describe views of type `V`.
    pub fn new<V, B, U>(build: B, update: U) -> Self
    where
        V: Any + Send,
        B: Fn(&ContainerHints) -> V + Send + Sync + 'static,
        U: Fn(&mut V, &ContainerHints) + Send + Sync + 'static,
    {
        let update = Arc::new(update);
        let apply = Arc::clone(&update);

        Self {
            kind: TypeId::of::<V>(),
            kind_name: type_name::<V>(),
            build: Arc::new(move |hints: &ContainerHints| -> Box<dyn Any + Send> {
                let mut view = build(hints);
                update(&mut view, hints);
                Box::new(view)
            }),
            update: Arc::new(
                move |view: &mut dyn Any, hints: &ContainerHints| -> Result<(), BindingError> {
                    let found = (*view).type_id();
                    let view = view.downcast_mut::<V>().ok_or_else(|| {
                        BindingError::KindMismatch {
                            expected: type_name::<V>(),
                            found: format!("view of type {found:?}"),
                        }
                    })?;
                    apply(view, hints);
                    Ok(())
                },
            ),
        }
    }

    /// Type name of the views this description builds.
    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }

    /// Build a new view and apply this description to it.
    pub fn build_view(&self, hints: &ContainerHints) -> Box<dyn Any + Send> {
        (self.build)(hints)
    }

    /// Whether `view` can be updated in place rather than rebuilt.
    pub fn can_update(&self, view: &dyn Any) -> bool {
        view.type_id() == self.kind
    }

    /// Apply this description to an existing view.
    ///
    /// # Panics
    ///
    /// Panics if `view` is not of the described kind. Check with
    /// [`can_update`](Self::can_update) or use [`try_update`](Self::try_update).
    pub fn update(&self, view: &mut dyn Any, hints: &ContainerHints) {
        if let Err(e) = self.try_update(view, hints) {
            panic!("{e}");
        }
    }

    /// Apply this description, failing if `view` is of another kind.
    pub fn try_update(
        &self,
        view: &mut dyn Any,
        hints: &ContainerHints,
    ) -> Result<(), BindingError> {
        (self.update)(view, hints)
    }
}

impl fmt::Debug for ViewDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescription")
            .field("kind", &self.kind_name)
            .finish()
    }
}
