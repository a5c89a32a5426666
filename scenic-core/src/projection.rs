/// Camera node: perspective projection and navigation
use crate::algebra::{self, Mat4, Vec3};
use crate::error::AlgebraError;

/// How keyboard input moves through the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Navigation {
    #[default]
    None,
    /// Input rotates every object and dollies the camera.
    Object,
    /// Input walks and turns the camera itself.
    Camera,
}

/// Navigation input, independent of the device that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKey {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Camera orientation in radians.
    pub rotation: Vec3,
    pub position: Vec3,
    pub navigation: Navigation,
    pub active: bool,
    aspect: f32,
    camera_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Camera {
    pub const DEFAULT_FIELD_OF_VIEW: f32 = 60.0;
    pub const DEFAULT_Z_NEAR: f32 = 1.0;
    pub const DEFAULT_Z_FAR: f32 = 2000.0;

    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            field_of_view: Self::DEFAULT_FIELD_OF_VIEW,
            z_near: Self::DEFAULT_Z_NEAR,
            z_far: Self::DEFAULT_Z_FAR,
            rotation: Vec3::zeros(),
            position: Vec3::zeros(),
            navigation: Navigation::None,
            active: false,
            aspect: Self::usable_aspect(aspect),
            camera_matrix: Mat4::identity(),
            projection_matrix: Mat4::identity(),
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Inverse of the camera placement, maps world space to view space.
    pub fn camera_matrix(&self) -> &Mat4 {
        &self.camera_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = Self::usable_aspect(aspect);
        self.update_projection();
    }

    /// A viewport with no width or height has no aspect; project as square.
    fn usable_aspect(aspect: f32) -> f32 {
        if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            log::warn!("ignoring viewport aspect {aspect}, using 1");
            1.0
        }
    }

    fn update_projection(&mut self) {
        self.projection_matrix = algebra::perspective(
            algebra::radians(self.field_of_view),
            self.aspect,
            self.z_near,
            self.z_far,
        );
    }

    /// Recomputes both matrices after the public fields changed.
    pub fn update(&mut self) -> Result<(), AlgebraError> {
        self.update_projection();

        let p = &self.position;
        let m = algebra::translate(&algebra::identity(), p.x, p.y, p.z);
        let m = algebra::z_rotate(&m, self.rotation.z);
        let m = algebra::y_rotate(&m, self.rotation.y);
        let m = algebra::x_rotate(&m, self.rotation.x);
        self.camera_matrix = algebra::inverse(&m)?;
        Ok(())
    }

    /// Maps a direction in the camera's own frame to world space,
    /// using the camera's pitch and yaw.
    pub fn shift(&self, direction: &Vec3) -> Result<Vec3, AlgebraError> {
        let rot = algebra::y_rotate(&algebra::identity(), self.rotation.y);
        let rot = algebra::x_rotate(&rot, self.rotation.x);
        let rot = algebra::inverse(&rot)?;
        Ok((rot * direction.push(0.0)).xyz())
    }

    /// Moves the camera along `direction` given in its own frame.
    pub fn move_local(&mut self, direction: &Vec3) -> Result<(), AlgebraError> {
        self.position += self.shift(direction)?;
        self.update()
    }

    /// Turns the camera by `delta` radians per axis.
    pub fn rotate(&mut self, delta: &Vec3) -> Result<(), AlgebraError> {
        self.rotation += delta;
        self.update()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_vec_eq(a: &Vec3, b: &Vec3) {
        assert!((a - b).norm() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800.0 / 600.0);
        assert_eq!(camera.navigation, Navigation::None);
        assert!((camera.aspect() - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(camera.field_of_view, 60.0);
        assert_eq!(camera.projection_matrix()[(2, 3)], -1.0);
        assert_eq!(*camera.camera_matrix(), Mat4::identity());
    }

    #[test]
    fn test_camera_matrix_is_inverse_placement() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.update().unwrap();
        let p = algebra::transform_point(camera.camera_matrix(), &Vec3::new(0.0, 0.0, 10.0));
        assert_vec_eq(&p.xyz(), &Vec3::zeros());
    }

    #[test]
    fn test_forward_move_without_rotation() {
        let mut camera = Camera::default();
        camera.move_local(&Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert_vec_eq(&camera.position, &Vec3::new(0.0, 0.0, -1.0));
        let p = algebra::transform_point(camera.camera_matrix(), &Vec3::new(0.0, 0.0, -3.0));
        assert_vec_eq(&p.xyz(), &Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_shift_follows_yaw() {
        let mut camera = Camera::default();
        camera.rotate(&Vec3::new(0.0, FRAC_PI_2, 0.0)).unwrap();
        let shift = camera.shift(&Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert!((shift.norm() - 1.0).abs() < 1e-5);
        assert!(shift.z.abs() < 1e-5);
        assert!((shift.x.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_set_aspect_updates_projection() {
        let mut camera = Camera::new(1.0);
        let before = camera.projection_matrix()[(0, 0)];
        camera.set_aspect(2.0);
        assert!((camera.projection_matrix()[(0, 0)] - before / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_viewport_keeps_projection_finite() {
        for aspect in [0.0, -2.0, f32::INFINITY, f32::NAN] {
            let camera = Camera::new(aspect);
            assert_eq!(camera.aspect(), 1.0);
            assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));
        }

        let mut camera = Camera::new(2.0);
        camera.set_aspect(0.0);
        assert_eq!(camera.aspect(), 1.0);
        assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));
    }
}
