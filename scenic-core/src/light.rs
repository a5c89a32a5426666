/// Directed light with an ambient term
use crate::algebra::{self, Mat3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedLight {
    /// Ambient colour, 0..=1 per channel.
    pub ambient: Vec3,
    /// Colour of the directed component, 0..=1 per channel.
    pub directed: Vec3,
    /// Unit vector pointing from the surface towards the light.
    reverse_direction: Vec3,
}

impl DirectedLight {
    pub const DEFAULT_AMBIENT: [f32; 3] = [100.0, 100.0, 100.0];
    pub const DEFAULT_DIRECTED: [f32; 3] = [200.0, 200.0, 200.0];
    pub const DEFAULT_DIRECTION: [f32; 3] = [0.0, 0.0, -1.0];

    /// Builds a light from 0..=255 colours and the direction the light travels.
    pub fn new(ambient: [f32; 3], directed: [f32; 3], direction: Vec3) -> Self {
        Self {
            ambient: Vec3::from(ambient) / 255.0,
            directed: Vec3::from(directed) / 255.0,
            reverse_direction: -algebra::normalize(&direction),
        }
    }

    pub fn reverse_direction(&self) -> &Vec3 {
        &self.reverse_direction
    }

    /// Per-channel light factor for a surface normal after applying the
    /// object's normal matrix.
    pub fn intensity(&self, normal_matrix: &Mat3, normal: &Vec3) -> Vec3 {
        let n = algebra::transform_normal(normal_matrix, normal);
        let weight = n.dot(&self.reverse_direction).max(0.0);
        self.ambient + self.directed * weight
    }
}

impl Default for DirectedLight {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_AMBIENT,
            Self::DEFAULT_DIRECTED,
            Vec3::from(Self::DEFAULT_DIRECTION),
        )
    }
}

/// Light factor for a scene that may have no light at all. An unlit
/// scene draws every surface at full colour.
pub fn light_factor(light: Option<&DirectedLight>, normal_matrix: &Mat3, normal: &Vec3) -> Vec3 {
    match light {
        Some(light) => light.intensity(normal_matrix, normal),
        None => Vec3::new(1.0, 1.0, 1.0),
    }
}
