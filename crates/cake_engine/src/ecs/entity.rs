//! Entity implementation

use std::collections::HashMap;

use crate::ecs::{Component, ComponentTypeId, EntityKey, UpdateContext};
use crate::render::DrawList;

/// A bag of owned components plus an active flag
///
/// Entities are created by [`crate::ecs::Manager::add_entity`] and live until
/// the manager's next `refresh()` after [`Entity::pop`] was called.
pub struct Entity {
    key: EntityKey,
    active: bool,
    components: Vec<Box<dyn Component>>,
    slots: HashMap<ComponentTypeId, usize>,
}

impl Entity {
    pub(crate) fn new(key: EntityKey) -> Self {
        Self {
            key,
            active: true,
            components: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Key of this entity in its manager
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Whether the entity survives the next refresh
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the entity for removal on the next refresh
    pub fn pop(&mut self) {
        self.active = false;
    }

    /// Attach a component and return a reference to it
    ///
    /// Adding a type the entity already owns replaces the previous instance
    /// in place. The old instance is dropped immediately and keeps its
    /// position in the update order.
    pub fn add_component<T: Component>(&mut self, mut component: T) -> &mut T {
        component.on_attach(self.key);
        let type_id = ComponentTypeId::of::<T>();

        let index = if let Some(&index) = self.slots.get(&type_id) {
            log::warn!(
                "Replacing existing {} on entity {:?}",
                std::any::type_name::<T>(),
                self.key
            );
            self.components[index] = Box::new(component);
            index
        } else {
            self.components.push(Box::new(component));
            let index = self.components.len() - 1;
            self.slots.insert(type_id, index);
            index
        };

        let stored: &mut dyn Component = self.components[index].as_mut();
        match stored.as_any_mut().downcast_mut::<T>() {
            Some(component) => component,
            None => unreachable!("slot index always points at the component just stored"),
        }
    }

    /// Whether a component of type `T` is attached
    pub fn has_component<T: Component>(&self) -> bool {
        self.slots.contains_key(&ComponentTypeId::of::<T>())
    }

    /// Borrow the component of type `T`, if attached
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        let index = *self.slots.get(&ComponentTypeId::of::<T>())?;
        let stored: &dyn Component = self.components[index].as_ref();
        stored.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the component of type `T`, if attached
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = *self.slots.get(&ComponentTypeId::of::<T>())?;
        let stored: &mut dyn Component = self.components[index].as_mut();
        stored.as_any_mut().downcast_mut::<T>()
    }

    /// Borrow the component of type `T`
    ///
    /// # Panics
    /// Panics if `T` was never added to this entity.
    pub fn component<T: Component>(&self) -> &T {
        match self.get_component::<T>() {
            Some(component) => component,
            None => panic!(
                "entity {:?} has no {} component",
                self.key,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Update every updatable component in insertion order
    pub fn update(&mut self, ctx: &UpdateContext<'_>) {
        for component in &mut self.components {
            if let Some(updatable) = component.as_mut().as_updatable() {
                updatable.update(ctx);
            }
        }
    }

    /// Collect draw requests from every drawable component in insertion order
    pub fn draw(&self, list: &mut DrawList) {
        for component in &self.components {
            if let Some(drawable) = component.as_ref().as_drawable() {
                drawable.draw(self.key, list);
            }
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("key", &self.key)
            .field("active", &self.active)
            .field("components", &self.components.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Manager, Updatable};
    use crate::input::KeyboardState;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);
    impl Component for Name {}

    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Component for Recorder {
        fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }
    }

    impl Updatable for Recorder {
        fn update(&mut self, _ctx: &UpdateContext<'_>) {
            self.log.borrow_mut().push(self.label);
        }
    }

    struct Tracked(Rc<RefCell<u32>>);
    impl Component for Tracked {}
    impl Drop for Tracked {
        fn drop(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    struct OrderTracer(Rc<RefCell<Vec<&'static str>>>);
    impl Component for OrderTracer {
        fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }
    }
    impl Updatable for OrderTracer {
        fn update(&mut self, _ctx: &UpdateContext<'_>) {
            self.0.borrow_mut().push("tracer");
        }
    }

    #[test]
    fn test_has_component_before_and_after_add() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();

        assert!(!entity.has_component::<Health>());
        assert!(entity.get_component::<Health>().is_none());

        entity.add_component(Health(10));
        assert!(entity.has_component::<Health>());
        assert!(!entity.has_component::<Name>());
    }

    #[test]
    fn test_get_component_returns_added_instance() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();

        let added: *const Health = entity.add_component(Health(7));
        entity.add_component(Name("ship"));

        let fetched: *const Health = entity.component::<Health>();
        assert_eq!(added, fetched);
        assert_eq!(entity.component::<Health>(), &Health(7));
        assert_eq!(entity.component::<Name>(), &Name("ship"));
    }

    #[test]
    fn test_get_component_mut_modifies_in_place() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();
        entity.add_component(Health(1));

        if let Some(health) = entity.get_component_mut::<Health>() {
            health.0 = 99;
        }
        assert_eq!(entity.component::<Health>(), &Health(99));
    }

    #[test]
    fn test_readding_component_replaces_and_releases_old_instance() {
        let drops = Rc::new(RefCell::new(0));
        let mut manager = Manager::new();
        let entity = manager.add_entity();

        entity.add_component(Tracked(Rc::clone(&drops)));
        entity.add_component(Name("a"));
        entity.add_component(Tracked(Rc::clone(&drops)));

        assert_eq!(*drops.borrow(), 1);
        assert_eq!(entity.component_count(), 2);
    }

    #[test]
    fn test_replaced_component_keeps_update_position() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = Manager::new();
        let entity = manager.add_entity();

        entity.add_component(Recorder { label: "first", log: Rc::clone(&log) });
        entity.add_component(OrderTracer(Rc::clone(&log)));
        entity.add_component(Recorder { label: "second", log: Rc::clone(&log) });

        let keyboard = KeyboardState::new();
        entity.update(&UpdateContext { delta_time: 0.016, keyboard: &keyboard });

        assert_eq!(*log.borrow(), vec!["second", "tracer"]);
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_checked_accessor_panics_when_missing() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();
        let _ = entity.component::<Health>();
    }

    #[test]
    fn test_pop_marks_inactive() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();
        assert!(entity.is_active());
        entity.pop();
        assert!(!entity.is_active());
    }
}
