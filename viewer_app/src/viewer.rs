//! Demo scene: a camera and three textured models

use cake_engine::assets::{AssetHandle, ImageData, MeshData, ShaderCode};
use cake_engine::prelude::*;

const SPIN_SPEED: f32 = 45.0;
const CHECKER_SIZE: u32 = 256;
const CHECKER_CELL: u32 = 32;

/// Viewer application state
pub struct Viewer {
    models: Vec<EntityKey>,
    spinning: bool,
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            spinning: true,
        }
    }
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_model(
        &mut self,
        ctx: &mut EngineContext<'_>,
        shader: &AssetHandle<ShaderCode>,
        model: AssetHandle<MeshData>,
        texture: AssetHandle<ImageData>,
        transform: Transform,
    ) -> Result<(), AppError> {
        let entity = ctx.manager.add_entity();
        entity.add_component(transform);
        entity.add_component(ModelRenderer::new(model));
        entity.add_component(TextureRenderer::new(texture));
        let key = entity.key();

        ctx.add_renderable(key, shader.clone())?;
        self.models.push(key);
        Ok(())
    }
}

impl Application for Viewer {
    fn initialize(&mut self, ctx: &mut EngineContext<'_>) -> Result<(), AppError> {
        let shader = ctx.assets.add_shader("basic", "basic.vert.spv", "basic.frag.spv")?;

        let cube = match ctx.assets.add_mesh("cube", "cube.obj") {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("{}, using a quad instead", e);
                ctx.assets.insert_mesh("cube", MeshData::quad())?
            }
        };
        let quad = ctx.assets.insert_mesh("quad", MeshData::quad())?;

        let checker = ctx.assets.insert_texture("checker", checkerboard(CHECKER_SIZE, CHECKER_CELL));
        let crate_texture = match ctx.assets.add_texture("crate", "crate.png") {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("{}, using the checkerboard instead", e);
                checker.clone()
            }
        };

        let camera = ctx.manager.add_entity();
        camera.add_component(PerspectiveCamera::new(Vec3::new(4.0, 4.0, 3.0), Vec3::zeros()));
        let camera = camera.key();
        ctx.set_camera(camera);

        self.spawn_model(
            ctx,
            &shader,
            cube.clone(),
            crate_texture,
            Transform::from_position(Vec3::new(0.0, 0.0, 0.0)),
        )?;
        self.spawn_model(
            ctx,
            &shader,
            cube,
            checker.clone(),
            Transform::from_position(Vec3::new(0.0, 2.5, 0.0)).with_scale(Vec3::new(0.5, 0.5, 0.5)),
        )?;
        self.spawn_model(
            ctx,
            &shader,
            quad,
            checker,
            Transform::from_position(Vec3::new(0.0, 0.0, -1.0)).with_scale(Vec3::new(6.0, 6.0, 1.0)),
        )?;

        log::info!("Scene ready with {} models", self.models.len());
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext<'_>, delta_time: f32) -> Result<(), AppError> {
        if ctx.keyboard.is_key_down(Key::R) {
            self.spinning = !self.spinning;
            log::info!("Spin {}", if self.spinning { "on" } else { "off" });
        }

        if ctx.keyboard.is_key_down(Key::Delete) {
            if let Some(key) = self.models.pop() {
                if let Some(entity) = ctx.manager.entity_mut(key) {
                    entity.pop();
                    log::info!("Removed model {:?}", key);
                }
            }
        }

        if self.spinning {
            // The ground quad stays put
            for &key in self.models.iter().take(2) {
                let transform = ctx
                    .manager
                    .entity_mut(key)
                    .and_then(|entity| entity.get_component_mut::<Transform>());
                if let Some(transform) = transform {
                    transform.rotate(Vec3::new(0.0, 0.0, SPIN_SPEED * delta_time));
                }
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut EngineContext<'_>) {
        log::info!("Viewer closing with {} entities", ctx.manager.len());
    }
}

/// Grey and white checkerboard
fn checkerboard(size: u32, cell: u32) -> ImageData {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if light { 230 } else { 90 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    ImageData {
        pixels,
        width: size,
        height: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_alternates_cells() {
        let image = checkerboard(4, 2);
        assert_eq!(image.size_bytes(), 64);
        let pixel = |x: usize, y: usize| image.pixels[(y * 4 + x) * 4];
        assert_eq!(pixel(0, 0), 230);
        assert_eq!(pixel(2, 0), 90);
        assert_eq!(pixel(2, 2), 230);
    }
}
