//! Orbit camera for viewing the particle cloud.
//!
//! The camera belongs to the host layer: the simulation never reads it, the
//! renderers only consume its matrices.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Near clip plane distance.
pub const NEAR: f32 = 0.1;
/// Far clip plane distance.
pub const FAR: f32 = 1000.0;

const MIN_DISTANCE: f32 = 1.0;
const MAX_DISTANCE: f32 = 200.0;
const PITCH_LIMIT: f32 = 1.5;

/// Orbit camera around a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Auto-orbit speed; `1.0` is one revolution per 3600 frames.
    pub auto_rotate_speed: f32,
}

impl OrbitCamera {
    /// Create a camera looking at the origin down -Z.
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: config.distance,
            target: Vec3::ZERO,
            fov_y: config.fov_degrees.to_radians(),
            auto_rotate_speed: config.auto_rotate_speed,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Perspective projection for a viewport of the given aspect ratio.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, NEAR, FAR)
    }

    /// Advance the automatic orbit by one frame.
    pub fn auto_rotate(&mut self) {
        self.yaw += TAU / 60.0 / 60.0 * self.auto_rotate_speed;
    }

    /// Rotate by a mouse drag of `(dx, dy)` pixels.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Zoom by a scroll amount; positive moves closer.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance - scroll * self.distance * 0.1).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position_on_z_axis() {
        let cam = OrbitCamera::default();
        let pos = cam.position();
        assert!((pos - Vec3::new(0.0, 0.0, 20.0)).length() < 1e-5);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let cam = OrbitCamera::default();
        let clip = cam.projection_matrix(16.0 / 9.0) * cam.view_matrix() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
    }

    #[test]
    fn test_auto_rotate_full_turn() {
        let mut cam = OrbitCamera::default();
        cam.auto_rotate_speed = 1.0;
        for _ in 0..3600 {
            cam.auto_rotate();
        }
        assert!((cam.yaw - TAU).abs() < 1e-3);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = OrbitCamera::default();
        cam.drag(0.0, 10_000.0);
        assert_eq!(cam.pitch, PITCH_LIMIT);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = OrbitCamera::default();
        for _ in 0..200 {
            cam.zoom(5.0);
        }
        assert_eq!(cam.distance, MIN_DISTANCE);
    }
}
