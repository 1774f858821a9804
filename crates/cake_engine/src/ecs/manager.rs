//! Entity store
//!
//! Entities live in a slot map so their keys stay valid while other
//! entities are added. A separate key list keeps traversal in insertion
//! order, which the slot map alone does not guarantee once slots are reused.

use slotmap::SlotMap;

use crate::ecs::{Entity, UpdateContext};
use crate::render::DrawList;

slotmap::new_key_type! {
    /// Stable handle to an entity owned by a [`Manager`]
    pub struct EntityKey;
}

/// Owns every entity and drives the per-frame traversal
#[derive(Default)]
pub struct Manager {
    entities: SlotMap<EntityKey, Entity>,
    order: Vec<EntityKey>,
}

impl Manager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new active entity
    pub fn add_entity(&mut self) -> &mut Entity {
        let key = self.entities.insert_with_key(Entity::new);
        self.order.push(key);
        log::trace!("Added entity {:?}", key);
        &mut self.entities[key]
    }

    /// Look up an entity
    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Look up an entity mutably
    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Whether `key` still refers to a stored entity
    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Number of stored entities, active or not
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the manager holds no entities
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entity keys in insertion order
    pub fn keys(&self) -> &[EntityKey] {
        &self.order
    }

    /// Entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(|&key| self.entities.get(key))
    }

    /// Update every stored entity
    ///
    /// Inactive entities are still updated until the next [`Manager::refresh`]
    /// removes them.
    pub fn update(&mut self, ctx: &UpdateContext<'_>) {
        for &key in &self.order {
            if let Some(entity) = self.entities.get_mut(key) {
                entity.update(ctx);
            }
        }
    }

    /// Collect draw requests from every stored entity, active or not
    pub fn draw(&self, list: &mut DrawList) {
        for entity in self.iter() {
            entity.draw(list);
        }
    }

    /// Drop every inactive entity, keeping survivors in order
    ///
    /// Returns the keys that were removed.
    pub fn refresh(&mut self) -> Vec<EntityKey> {
        let entities = &mut self.entities;
        let mut removed = Vec::new();

        self.order.retain(|&key| {
            let keep = entities.get(key).is_some_and(Entity::is_active);
            if !keep {
                entities.remove(key);
                removed.push(key);
            }
            keep
        });

        if !removed.is_empty() {
            log::debug!("Refresh removed {} entities", removed.len());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, Updatable};
    use crate::input::KeyboardState;

    struct Counter(u32);

    impl Component for Counter {
        fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }
    }

    impl Updatable for Counter {
        fn update(&mut self, _ctx: &UpdateContext<'_>) {
            self.0 += 1;
        }
    }

    fn spawn(manager: &mut Manager, n: usize) -> Vec<EntityKey> {
        (0..n).map(|_| manager.add_entity().key()).collect()
    }

    #[test]
    fn test_add_entity_yields_distinct_entities() {
        let mut manager = Manager::new();
        let keys = spawn(&mut manager, 10);

        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 10);
        assert_eq!(manager.len(), 10);
    }

    #[test]
    fn test_refresh_removes_popped_and_preserves_order() {
        let mut manager = Manager::new();
        let keys = spawn(&mut manager, 8);

        for &index in &[1usize, 4, 5] {
            if let Some(entity) = manager.entity_mut(keys[index]) {
                entity.pop();
            }
        }
        assert_eq!(manager.len(), 8);

        let removed = manager.refresh();
        assert_eq!(removed, vec![keys[1], keys[4], keys[5]]);
        assert_eq!(manager.len(), 5);

        let expected: Vec<EntityKey> = [0usize, 2, 3, 6, 7].iter().map(|&i| keys[i]).collect();
        assert_eq!(manager.keys(), expected.as_slice());
        assert!(!manager.contains(keys[4]));
    }

    #[test]
    fn test_order_survives_slot_reuse() {
        let mut manager = Manager::new();
        let keys = spawn(&mut manager, 3);
        if let Some(entity) = manager.entity_mut(keys[0]) {
            entity.pop();
        }
        manager.refresh();

        let newest = manager.add_entity().key();
        let order: Vec<EntityKey> = manager.iter().map(Entity::key).collect();
        assert_eq!(order, vec![keys[1], keys[2], newest]);
    }

    #[test]
    fn test_keys_stay_valid_across_additions() {
        let mut manager = Manager::new();
        let first = manager.add_entity().key();
        if let Some(entity) = manager.entity_mut(first) {
            entity.add_component(Counter(5));
        }
        spawn(&mut manager, 100);

        let entity = manager.entity(first).expect("first entity survives growth");
        assert_eq!(entity.component::<Counter>().0, 5);
    }

    #[test]
    fn test_inactive_entities_update_until_refresh() {
        let mut manager = Manager::new();
        let key = manager.add_entity().key();
        if let Some(entity) = manager.entity_mut(key) {
            entity.add_component(Counter(0));
            entity.pop();
        }

        let keyboard = KeyboardState::new();
        let ctx = UpdateContext { delta_time: 0.1, keyboard: &keyboard };
        manager.update(&ctx);
        manager.update(&ctx);

        let count = manager.entity(key).map(|entity| entity.component::<Counter>().0);
        assert_eq!(count, Some(2));

        manager.refresh();
        manager.update(&ctx);
        assert!(manager.is_empty());
    }
}
