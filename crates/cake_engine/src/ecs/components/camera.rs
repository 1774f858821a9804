//! Perspective camera component
//!
//! Free-fly camera in a Z-up world. W/S/A/D move along the look direction
//! and its right vector, arrow keys turn.

use crate::ecs::{Component, UpdateContext, Updatable};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::input::Key;

/// Smallest accepted field of view in degrees
pub const MIN_FOV: f32 = 30.0;
/// Largest accepted field of view in degrees
pub const MAX_FOV: f32 = 90.0;

const MOVE_SPEED: f32 = 2.0;
const TURN_SPEED: f32 = 60.0;
const PITCH_LIMIT: f32 = 89.0;

/// Camera producing the view and projection matrices for the frame
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    fov: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    position: Vec3,
    yaw: f32,
    pitch: f32,
}

impl Component for PerspectiveCamera {
    fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
        Some(self)
    }
}

impl Default for PerspectiveCamera {
    /// 60 degree camera at (3, 3, 3) looking at the origin
    fn default() -> Self {
        let mut camera = Self {
            fov: 60.0,
            aspect_ratio: 800.0 / 600.0,
            near: 0.1,
            far: 10.0,
            position: Vec3::new(3.0, 3.0, 3.0),
            yaw: 0.0,
            pitch: 0.0,
        };
        camera.look_at(Vec3::zeros());
        camera
    }
}

impl Updatable for PerspectiveCamera {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        self.move_camera(ctx);
        self.adjust_direction(ctx);
    }
}

impl PerspectiveCamera {
    /// Create a camera at `position` looking at `target`
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            position,
            ..Self::default()
        };
        camera.look_at(target);
        camera
    }

    /// Point the camera at `target`
    ///
    /// Does nothing if `target` coincides with the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let offset = target - self.position;
        let Some(direction) = offset.try_normalize(f32::EPSILON) else {
            return;
        };
        self.yaw = utils::rad_to_deg(direction.y.atan2(direction.x));
        self.pitch = utils::rad_to_deg(direction.z.asin()).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Set the field of view in degrees
    ///
    /// Values outside [`MIN_FOV`, `MAX_FOV`] are rejected and leave the
    /// current value unchanged.
    pub fn set_fov(&mut self, fov: f32) -> bool {
        if (MIN_FOV..=MAX_FOV).contains(&fov) {
            self.fov = fov;
            true
        } else {
            log::warn!(
                "Rejected field of view {fov}: must be within [{MIN_FOV}, {MAX_FOV}] degrees"
            );
            false
        }
    }

    /// Width divided by height of the target viewport
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Update the aspect ratio for a viewport change
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if (self.aspect_ratio - aspect_ratio).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect_ratio, aspect_ratio);
        }
        self.aspect_ratio = aspect_ratio;
    }

    /// Set the near and far clip distances
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the camera without changing where it looks
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Heading around +Z in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Elevation in degrees, within +/-89
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Unit vector the camera looks along
    pub fn direction(&self) -> Vec3 {
        let yaw = utils::deg_to_rad(self.yaw);
        let pitch = utils::deg_to_rad(self.pitch);
        Vec3::new(yaw.cos() * pitch.cos(), yaw.sin() * pitch.cos(), pitch.sin()).normalize()
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.direction(), Vec3::z())
    }

    /// Perspective projection with zero-to-one depth
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_zo(utils::deg_to_rad(self.fov), self.aspect_ratio, self.near, self.far)
    }

    fn move_camera(&mut self, ctx: &UpdateContext<'_>) {
        let keyboard = ctx.keyboard;
        let step = MOVE_SPEED * ctx.delta_time;
        let forward = self.direction();

        if keyboard.is_key_pressed(Key::W) {
            self.position += step * forward;
        } else if keyboard.is_key_pressed(Key::S) {
            self.position -= step * forward;
        }

        if let Some(right) = forward.cross(&Vec3::z()).try_normalize(f32::EPSILON) {
            if keyboard.is_key_pressed(Key::D) {
                self.position += step * right;
            } else if keyboard.is_key_pressed(Key::A) {
                self.position -= step * right;
            }
        }
    }

    fn adjust_direction(&mut self, ctx: &UpdateContext<'_>) {
        let keyboard = ctx.keyboard;
        let step = TURN_SPEED * ctx.delta_time;

        if keyboard.is_key_pressed(Key::Up) {
            self.pitch += step;
        } else if keyboard.is_key_pressed(Key::Down) {
            self.pitch -= step;
        }

        if keyboard.is_key_pressed(Key::Left) {
            self.yaw += step;
        } else if keyboard.is_key_pressed(Key::Right) {
            self.yaw -= step;
        }

        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyboardState;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_fov_bounds_scenario() {
        let mut camera = PerspectiveCamera::default();
        assert_relative_eq!(camera.fov(), 60.0);

        assert!(camera.set_fov(45.0));
        assert_relative_eq!(camera.fov(), 45.0);

        assert!(!camera.set_fov(10.0));
        assert_relative_eq!(camera.fov(), 45.0);

        assert!(camera.set_fov(90.0));
        assert_relative_eq!(camera.fov(), 90.0);

        assert!(camera.set_fov(30.0));
        assert!(!camera.set_fov(90.5));
        assert_relative_eq!(camera.fov(), 30.0);
    }

    #[test]
    fn test_default_camera_looks_at_origin() {
        let camera = PerspectiveCamera::default();
        let expected = (-camera.position()).normalize();
        assert_relative_eq!(camera.direction(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_w_moves_forward_at_fixed_speed() {
        let mut camera = PerspectiveCamera::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::W);

        camera.update(&UpdateContext { delta_time: 0.5, keyboard: &keyboard });
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_d_strafes_right_in_z_up_world() {
        let mut camera = PerspectiveCamera::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::D);

        camera.update(&UpdateContext { delta_time: 1.0, keyboard: &keyboard });
        assert_relative_eq!(camera.position(), Vec3::new(0.0, -2.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = PerspectiveCamera::default();
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::Up);

        for _ in 0..10 {
            camera.update(&UpdateContext { delta_time: 1.0, keyboard: &keyboard });
        }
        assert_relative_eq!(camera.pitch(), 89.0);
    }

    #[test]
    fn test_projection_tracks_aspect_ratio() {
        let mut camera = PerspectiveCamera::default();
        camera.set_aspect_ratio(2.0);
        let proj = camera.projection_matrix();
        assert_relative_eq!(proj[(0, 0)] * 2.0, proj[(1, 1)], epsilon = EPSILON);
    }
}
