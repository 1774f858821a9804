//! Renderable bindings
//!
//! The table pairs every renderable entity with the pipeline that draws it.
//! Both lists always have the same length and order: the only way in is
//! [`RenderBindings::bind`], and every removal drops both halves together.

use crate::assets::{AssetHandle, ShaderCode};
use crate::ecs::EntityKey;

/// What the renderer needs to rebuild an entity's pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderable {
    /// Entity drawn by the pipeline
    pub entity: EntityKey,
    /// Shader program the pipeline is built from
    pub shader: AssetHandle<ShaderCode>,
}

/// Lock-step list of renderables and their pipelines
#[derive(Debug)]
pub struct RenderBindings<P> {
    renderables: Vec<Renderable>,
    pipelines: Vec<P>,
}

impl<P> Default for RenderBindings<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RenderBindings<P> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            renderables: Vec::new(),
            pipelines: Vec::new(),
        }
    }

    /// Append a renderable together with its pipeline
    pub fn bind(&mut self, renderable: Renderable, pipeline: P) {
        self.renderables.push(renderable);
        self.pipelines.push(pipeline);
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.renderables.len(), self.pipelines.len());
        self.renderables.len()
    }

    /// True when nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renderables in draw order
    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    /// Entities in draw order
    pub fn entities(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.renderables.iter().map(|renderable| renderable.entity)
    }

    /// Pipelines in draw order
    pub fn pipelines(&self) -> &[P] {
        &self.pipelines
    }

    /// Whether `entity` already has a binding
    pub fn contains(&self, entity: EntityKey) -> bool {
        self.renderables.iter().any(|renderable| renderable.entity == entity)
    }

    /// Pairs in draw order
    pub fn iter(&self) -> impl Iterator<Item = (&Renderable, &P)> + '_ {
        self.renderables.iter().zip(&self.pipelines)
    }

    /// Pairs in draw order with mutable pipelines
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Renderable, &mut P)> + '_ {
        self.renderables.iter().zip(&mut self.pipelines)
    }

    /// Keep only the bindings whose renderable satisfies `keep`
    ///
    /// Returns how many bindings were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&Renderable) -> bool) -> usize {
        let before = self.renderables.len();
        let mut kept = Vec::with_capacity(before);
        let mut kept_pipelines = Vec::with_capacity(before);
        for (renderable, pipeline) in self.renderables.drain(..).zip(self.pipelines.drain(..)) {
            if keep(&renderable) {
                kept.push(renderable);
                kept_pipelines.push(pipeline);
            }
        }
        self.renderables = kept;
        self.pipelines = kept_pipelines;
        before - self.renderables.len()
    }

    /// Drop every pipeline and hand back the renderables in order
    ///
    /// Used to rebuild all pipelines from scratch; rebinding the returned
    /// list restores the original order.
    pub fn clear(&mut self) -> Vec<Renderable> {
        self.pipelines.clear();
        std::mem::take(&mut self.renderables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Manager;

    #[derive(Debug, PartialEq)]
    struct FakePipeline {
        entity: EntityKey,
        generation: u32,
    }

    fn renderable(entity: EntityKey) -> Renderable {
        Renderable {
            entity,
            shader: AssetHandle::new("basic"),
        }
    }

    fn three_entities() -> (Manager, Vec<EntityKey>) {
        let mut manager = Manager::new();
        let keys = (0..3).map(|_| manager.add_entity().key()).collect();
        (manager, keys)
    }

    fn assert_lock_step(bindings: &RenderBindings<FakePipeline>) {
        assert_eq!(bindings.renderables().len(), bindings.pipelines().len());
        for (renderable, pipeline) in bindings.iter() {
            assert_eq!(renderable.entity, pipeline.entity);
        }
    }

    #[test]
    fn test_three_renderables_stay_paired() {
        let (_manager, keys) = three_entities();
        let mut bindings = RenderBindings::new();
        for &key in &keys {
            bindings.bind(renderable(key), FakePipeline { entity: key, generation: 0 });
        }

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.entities().collect::<Vec<_>>(), keys);
        assert_lock_step(&bindings);

        for frame in 0..10 {
            for (renderable, pipeline) in bindings.iter_mut() {
                assert_eq!(renderable.entity, pipeline.entity, "frame {frame}");
                pipeline.generation = frame;
            }
        }
        assert_lock_step(&bindings);
    }

    #[test]
    fn test_clear_and_rebind_preserves_order() {
        let (_manager, keys) = three_entities();
        let mut bindings = RenderBindings::new();
        for &key in &keys {
            bindings.bind(renderable(key), FakePipeline { entity: key, generation: 0 });
        }

        let renderables = bindings.clear();
        assert!(bindings.is_empty());
        assert_lock_step(&bindings);

        for renderable in renderables {
            let pipeline = FakePipeline {
                entity: renderable.entity,
                generation: 1,
            };
            bindings.bind(renderable, pipeline);
        }

        assert_eq!(bindings.entities().collect::<Vec<_>>(), keys);
        assert!(bindings.pipelines().iter().all(|p| p.generation == 1));
        assert_lock_step(&bindings);
    }

    #[test]
    fn test_retain_drops_both_halves() {
        let (mut manager, keys) = three_entities();
        let mut bindings = RenderBindings::new();
        for &key in &keys {
            bindings.bind(renderable(key), FakePipeline { entity: key, generation: 0 });
        }

        if let Some(entity) = manager.entity_mut(keys[1]) {
            entity.pop();
        }
        manager.refresh();

        let dropped = bindings.retain(|r| manager.contains(r.entity));
        assert_eq!(dropped, 1);
        assert_eq!(bindings.entities().collect::<Vec<_>>(), vec![keys[0], keys[2]]);
        assert_lock_step(&bindings);
        assert!(!bindings.contains(keys[1]));
    }
}
