//! Camera contract shared by the renderer and the cursor projection
//!
//! The renderer draws with [`CameraContract::view_projection`] and the cursor
//! projection unprojects through the inverse of the same matrix, so the two
//! cannot drift apart.

use glam::{Mat4, Vec3};

use crate::constants::{CAMERA_EYE_DISTANCE, CAMERA_FOV_Y, CAMERA_Z_FAR, CAMERA_Z_NEAR};

/// Fixed camera looking down -Z at the origin from `eye_distance`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraContract {
    pub eye_distance: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraContract {
    fn default() -> Self {
        Self {
            eye_distance: CAMERA_EYE_DISTANCE,
            fov_y: CAMERA_FOV_Y,
            z_near: CAMERA_Z_NEAR,
            z_far: CAMERA_Z_FAR,
        }
    }
}

impl CameraContract {
    pub fn eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.eye_distance)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.z_near, self.z_far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// World-space ray through a point in normalized device coordinates.
    ///
    /// Returns `(origin, direction)` with the origin on the near plane.
    pub fn ndc_ray(&self, ndc_x: f32, ndc_y: f32, aspect: f32) -> (Vec3, Vec3) {
        let inverse = self.view_projection(aspect).inverse();
        // perspective_rh maps depth to [0, 1]
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        (near, (far - near).normalize_or_zero())
    }
}
