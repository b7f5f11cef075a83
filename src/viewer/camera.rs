//! Fly camera using dolly

use dolly::prelude::*;
use glam::{Mat4, Vec3};

use crate::pipeline::{FAR_PLANE, NEAR_PLANE};

/// Narrowest and widest field of view reachable with the scroll wheel, degrees.
pub const FOV_RANGE: (f32, f32) = (1.0, 90.0);

/// Free-flying camera: position plus yaw/pitch, zoom through the field of view.
pub struct FlyCamera {
    rig: CameraRig,
    /// Vertical FOV in degrees
    pub fov: f32,
    /// World units per second
    pub speed: f32,
    /// Degrees per pixel of mouse movement
    pub sensitivity: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3, yaw_degrees: f32, pitch_degrees: f32) -> Self {
        let rig = CameraRig::builder()
            .with(Position::new(mint::Point3 { x: position.x, y: position.y, z: position.z }))
            .with(YawPitch::new().yaw_degrees(yaw_degrees).pitch_degrees(pitch_degrees))
            .with(Smooth::new_position_rotation(0.5, 0.25))
            .build();

        Self {
            rig,
            fov: 45.0,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }

    /// Rotate by a mouse delta in pixels.
    pub fn look(&mut self, delta_x: f32, delta_y: f32) {
        self.rig
            .driver_mut::<YawPitch>()
            .rotate_yaw_pitch(-delta_x * self.sensitivity, -delta_y * self.sensitivity);
    }

    /// Move along the view direction (`forward`) and the right vector (`right`),
    /// each in [-1, 1].
    pub fn fly(&mut self, forward: f32, right: f32, dt: f32) {
        if forward == 0.0 && right == 0.0 {
            return;
        }
        let t = &self.rig.final_transform;
        let fwd: Vec3 = t.forward();
        let side: Vec3 = t.right();
        let delta = (fwd * forward + side * right).normalize_or_zero() * self.speed * dt;
        self.rig
            .driver_mut::<Position>()
            .translate(mint::Vector3 { x: delta.x, y: delta.y, z: delta.z });
    }

    /// Scroll zoom: positive `delta` narrows the field of view.
    pub fn zoom(&mut self, delta: f32) {
        self.fov = (self.fov - delta).clamp(FOV_RANGE.0, FOV_RANGE.1);
    }

    /// Update camera (call each frame)
    pub fn update(&mut self, dt: f32) {
        self.rig.update(dt);
    }

    /// Get camera position
    pub fn position(&self) -> Vec3 {
        let p = self.rig.final_transform.position;
        Vec3::new(p.x, p.y, p.z)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        let t = &self.rig.final_transform;
        let pos = self.position();
        let fwd: Vec3 = t.forward();
        let up: Vec3 = t.up();
        Mat4::look_at_rh(pos, pos + fwd, up)
    }

    /// glam's right-handed projection already maps depth to wgpu's 0..1.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 4.0), 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let mut camera = FlyCamera::default();
        camera.update(1.0);
        let view = camera.view_matrix();
        // Origin sits 4 units in front of the camera
        let p = view.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -4.0), 1e-4), "{p}");
    }

    #[test]
    fn test_zoom_clamps_fov() {
        let mut camera = FlyCamera::default();
        camera.zoom(500.0);
        assert_eq!(camera.fov, FOV_RANGE.0);
        camera.zoom(-500.0);
        assert_eq!(camera.fov, FOV_RANGE.1);
    }

    #[test]
    fn test_fly_forward_moves_toward_target() {
        let mut camera = FlyCamera::default();
        camera.update(1.0);
        camera.fly(1.0, 0.0, 1.0);
        // Let the smoothing settle
        for _ in 0..200 {
            camera.update(0.1);
        }
        let p = camera.position();
        assert!(p.z < 4.0 - 2.0, "{p}");
    }

    #[test]
    fn test_projection_depth_range() {
        let camera = FlyCamera::default();
        let proj = camera.projection_matrix(16.0 / 9.0);
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -NEAR_PLANE));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -FAR_PLANE));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }
}
