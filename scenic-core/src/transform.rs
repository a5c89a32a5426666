/// Scene transform nodes and per-object matrix composition
use crate::algebra::{self, Mat3, Mat4, Vec3};

/// Placement of an object in the scene.
///
/// Rotation angles are stored in radians. A node nested inside another
/// transform already carries its ancestors' offsets, see [`TransformNode::child`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformNode {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl TransformNode {
    pub fn new(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Combines this node with a nested `local` node. Translation and
    /// rotation add up, scale multiplies component-wise.
    pub fn child(&self, local: &TransformNode) -> TransformNode {
        TransformNode {
            translation: self.translation + local.translation,
            rotation: self.rotation + local.rotation,
            scale: self.scale.component_mul(&local.scale),
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, delta: &Vec3) {
        self.rotation += delta;
    }

    /// `base` followed by translate, rotate X, rotate Y, rotate Z.
    fn rigid(&self, base: &Mat4) -> Mat4 {
        let t = &self.translation;
        let m = algebra::translate(base, t.x, t.y, t.z);
        let m = algebra::x_rotate(&m, self.rotation.x);
        let m = algebra::y_rotate(&m, self.rotation.y);
        algebra::z_rotate(&m, self.rotation.z)
    }

    /// Object-to-world matrix: scale, then rotations, then translation.
    pub fn model_matrix(&self) -> Mat4 {
        let s = &self.scale;
        algebra::scale(&self.rigid(&algebra::identity()), s.x, s.y, s.z)
    }

    /// Full object-to-clip matrix for the given camera and projection.
    pub fn render_matrix(&self, camera: &Mat4, projection: &Mat4) -> Mat4 {
        let s = &self.scale;
        let m = algebra::scale(&self.rigid(camera), s.x, s.y, s.z);
        algebra::multiply(projection, &m)
    }

    /// World-space normal matrix. Scale and camera are left out.
    pub fn normal_matrix(&self) -> Mat3 {
        match algebra::normal_from_mat4(&self.rigid(&algebra::identity())) {
            Some(m) => m,
            None => {
                log::warn!("transform has a singular normal matrix, using identity");
                Mat3::identity()
            }
        }
    }
}

impl Default for TransformNode {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}
