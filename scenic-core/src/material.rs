/// Material records and flat-colour appearance
use crate::layout::AttributeKey;

/// A material record that `usemtl` lines refer to by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub specular_exponent: f32,
    pub emissive: [f32; 3],
    pub transmission_filter: [f32; 3],
    pub dissolve: f32,
    pub illumination: u16,
    pub refraction_index: f32,
    pub sharpness: f32,
    pub anti_aliasing: u16,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: [0.0; 3],
            diffuse: [0.0; 3],
            specular: [0.0; 3],
            specular_exponent: 0.0,
            emissive: [0.0; 3],
            transmission_filter: [0.0; 3],
            dissolve: 1.0,
            illumination: 0,
            refraction_index: 1.0,
            sharpness: 0.0,
            anti_aliasing: 0,
        }
    }

    pub fn with_diffuse(mut self, diffuse: [f32; 3]) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// Value of a material attribute, padded to four components.
    /// `None` for attributes that do not come from a material record.
    pub fn field(&self, key: AttributeKey) -> Option<[f32; 4]> {
        let rgb = |c: [f32; 3]| [c[0], c[1], c[2], 0.0];
        let scalar = |v: f32| [v, 0.0, 0.0, 0.0];
        let value = match key {
            AttributeKey::Ambient => rgb(self.ambient),
            AttributeKey::Diffuse => rgb(self.diffuse),
            AttributeKey::Specular => rgb(self.specular),
            AttributeKey::SpecularExponent => scalar(self.specular_exponent),
            AttributeKey::Emissive => rgb(self.emissive),
            AttributeKey::TransmissionFilter => rgb(self.transmission_filter),
            AttributeKey::Dissolve => scalar(self.dissolve),
            AttributeKey::Illumination => scalar(f32::from(self.illumination)),
            AttributeKey::RefractionIndex => scalar(self.refraction_index),
            AttributeKey::Sharpness => scalar(self.sharpness),
            AttributeKey::AntiAliasing => scalar(f32::from(self.anti_aliasing)),
            AttributeKey::Position
            | AttributeKey::Normal
            | AttributeKey::Tangent
            | AttributeKey::Bitangent
            | AttributeKey::Uv
            | AttributeKey::MaterialIndex
            | AttributeKey::MaterialEnabled => return None,
        };
        Some(value)
    }
}

/// Flat RGB colour of a shape, 0..=255 per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub rgb: [u8; 3],
}

impl Color {
    pub const WHITE: Color = Color { rgb: [255, 255, 255] };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b] }
    }

    /// Per-vertex colour array for a shape with `vertex_count` vertices.
    pub fn vertex_colors(&self, vertex_count: usize) -> Vec<u8> {
        self.rgb.repeat(vertex_count)
    }

    /// Channels scaled to 0..=1.
    pub fn as_unit(&self) -> [f32; 3] {
        self.rgb.map(|c| c as f32 / 255.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_colors() {
        let colors = Color::new(10, 20, 30).vertex_colors(2);
        assert_eq!(colors, vec![10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn test_material_fields() {
        let mut material = Material::new("steel").with_diffuse([0.5, 0.25, 1.0]);
        material.illumination = 2;
        assert_eq!(material.field(AttributeKey::Diffuse), Some([0.5, 0.25, 1.0, 0.0]));
        assert_eq!(material.field(AttributeKey::Illumination), Some([2.0, 0.0, 0.0, 0.0]));
        assert_eq!(material.field(AttributeKey::Dissolve), Some([1.0, 0.0, 0.0, 0.0]));
        assert_eq!(material.field(AttributeKey::Position), None);
        assert_eq!(material.field(AttributeKey::MaterialIndex), None);
    }

    #[test]
    fn test_as_unit() {
        let unit = Color::new(255, 0, 51).as_unit();
        assert_eq!(unit[0], 1.0);
        assert_eq!(unit[1], 0.0);
        assert!((unit[2] - 0.2).abs() < 1e-6);
    }
}
