//! Component traits and the component type registry

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::ecs::EntityKey;
use crate::input::KeyboardState;
use crate::render::DrawList;

/// Stable small integer identifying a component type
///
/// Assigned lazily the first time a type is queried and never reused for the
/// lifetime of the process. There is no upper bound on the number of types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Get the id for `T`, registering it on first use
    pub fn of<T: Any + ?Sized>() -> Self {
        static REGISTRY: OnceLock<Mutex<HashMap<TypeId, u32>>> = OnceLock::new();

        let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
        let mut ids = registry.lock().unwrap_or_else(PoisonError::into_inner);
        let next = u32::try_from(ids.len()).unwrap_or(u32::MAX);
        Self(*ids.entry(TypeId::of::<T>()).or_insert(next))
    }

    /// Raw integer value
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Upcasting helper so components can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-frame state handed to [`Updatable`] components
pub struct UpdateContext<'a> {
    /// Seconds since the previous update
    pub delta_time: f32,
    /// Keyboard state for this loop iteration
    pub keyboard: &'a KeyboardState,
}

/// A piece of data owned by exactly one entity
///
/// Every hook has a default so plain data components only need an empty
/// `impl`. Components with per-frame behaviour return themselves from the
/// matching capability accessor.
pub trait Component: AsAny {
    /// Called once when the component is attached to `owner`
    fn on_attach(&mut self, _owner: EntityKey) {}

    /// Per-frame update capability
    fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
        None
    }

    /// Draw capability
    fn as_drawable(&self) -> Option<&dyn Drawable> {
        None
    }
}

/// Components that advance their state every frame
pub trait Updatable {
    /// Advance by one frame
    fn update(&mut self, ctx: &UpdateContext<'_>);
}

/// Components that contribute draw requests
pub trait Drawable {
    /// Push this component's draw requests for `owner`
    fn draw(&self, owner: EntityKey, list: &mut DrawList);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;

    #[test]
    fn test_type_ids_are_distinct() {
        assert_ne!(ComponentTypeId::of::<Position>(), ComponentTypeId::of::<Velocity>());
    }

    #[test]
    fn test_type_ids_are_stable() {
        let first = ComponentTypeId::of::<Position>();
        let _ = ComponentTypeId::of::<Velocity>();
        let _ = ComponentTypeId::of::<u64>();
        assert_eq!(first, ComponentTypeId::of::<Position>());
        assert_eq!(first.index(), ComponentTypeId::of::<Position>().index());
    }

    #[test]
    fn test_registry_has_no_small_capacity() {
        macro_rules! register {
            ($($n:literal),*) => {{
                let mut ids = Vec::new();
                $( ids.push(ComponentTypeId::of::<[u8; $n]>()); )*
                ids
            }};
        }

        let mut ids = register!(
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
            21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40
        );
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }
}
