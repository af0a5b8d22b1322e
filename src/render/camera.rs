use crate::config::RenderConfig;
use glam::{Mat4, Vec3};

/// Drawable size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; a collapsed (zero-height) viewport reports 1.0.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Fixed camera looking at the cube down -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// How far the model is pushed away from the viewer.
    pub distance: f32,
    /// Unit rotation axis.
    pub axis: Vec3,
}

impl Camera {
    pub fn new(fov_y_degrees: f32, z_near: f32, z_far: f32, distance: f32, axis: Vec3) -> Self {
        let axis = axis.try_normalize().unwrap_or_else(|| Vec3::ONE.normalize());
        Self {
            fov_y_degrees,
            z_near,
            z_far,
            distance,
            axis,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.fov_y_degrees,
            config.z_near,
            config.z_far,
            config.camera_distance,
            Vec3::from_array(config.rotation_axis),
        )
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        projection_matrix(self.fov_y_degrees, aspect_ratio, self.z_near, self.z_far)
    }

    /// Identity, translated `distance` units away, then rotated by `angle`
    /// radians about `axis`.
    pub fn model_view_matrix(&self, angle: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * Mat4::from_axis_angle(self.axis, angle)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// OpenGL-style perspective projection (clip depth -1..1).
pub fn projection_matrix(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect_ratio, z_near, z_far)
}
