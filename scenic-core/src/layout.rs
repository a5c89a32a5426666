/// Interleaved vertex buffer layout and packing
use std::collections::HashSet;
use std::fmt;

use crate::error::LayoutError;
use crate::mesh::Mesh;

/// Semantic name of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Position,
    Normal,
    Tangent,
    Bitangent,
    Uv,
    MaterialIndex,
    MaterialEnabled,
    Ambient,
    Diffuse,
    Specular,
    SpecularExponent,
    Emissive,
    TransmissionFilter,
    Dissolve,
    Illumination,
    RefractionIndex,
    Sharpness,
    AntiAliasing,
}

impl AttributeKey {
    /// Shader-facing name of the attribute.
    pub fn name(self) -> &'static str {
        match self {
            AttributeKey::Position => "position",
            AttributeKey::Normal => "normal",
            AttributeKey::Tangent => "tangent",
            AttributeKey::Bitangent => "bitangent",
            AttributeKey::Uv => "uv",
            AttributeKey::MaterialIndex => "materialIndex",
            AttributeKey::MaterialEnabled => "materialEnabled",
            AttributeKey::Ambient => "ambient",
            AttributeKey::Diffuse => "diffuse",
            AttributeKey::Specular => "specular",
            AttributeKey::SpecularExponent => "specularExponent",
            AttributeKey::Emissive => "emissive",
            AttributeKey::TransmissionFilter => "transmissionFilter",
            AttributeKey::Dissolve => "dissolve",
            AttributeKey::Illumination => "illumination",
            AttributeKey::RefractionIndex => "refractionIndex",
            AttributeKey::Sharpness => "sharpness",
            AttributeKey::AntiAliasing => "antiAliasing",
        }
    }

    /// Whether the values come from the vertex's material record.
    pub fn is_material_field(self) -> bool {
        !matches!(
            self,
            AttributeKey::Position
                | AttributeKey::Normal
                | AttributeKey::Tangent
                | AttributeKey::Bitangent
                | AttributeKey::Uv
                | AttributeKey::MaterialIndex
                | AttributeKey::MaterialEnabled
        )
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Float,
}

impl ComponentType {
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::Float => 4,
        }
    }

    /// Writes one component in little-endian order. Integer types either
    /// scale a normalized value to their full range or saturate.
    fn write(self, normalized: bool, value: f32, out: &mut [u8]) {
        match self {
            ComponentType::Float => out.copy_from_slice(&value.to_le_bytes()),
            ComponentType::Byte => {
                let v = if normalized {
                    (value.clamp(-1.0, 1.0) * i8::MAX as f32).round() as i8
                } else {
                    value as i8
                };
                out.copy_from_slice(&v.to_le_bytes());
            }
            ComponentType::UnsignedByte => {
                let v = if normalized {
                    (value.clamp(0.0, 1.0) * u8::MAX as f32).round() as u8
                } else {
                    value as u8
                };
                out.copy_from_slice(&v.to_le_bytes());
            }
            ComponentType::Short => {
                let v = if normalized {
                    (value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
                } else {
                    value as i16
                };
                out.copy_from_slice(&v.to_le_bytes());
            }
            ComponentType::UnsignedShort => {
                let v = if normalized {
                    (value.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
                } else {
                    value as u16
                };
                out.copy_from_slice(&v.to_le_bytes());
            }
        }
    }
}

/// How one attribute is stored per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub key: AttributeKey,
    /// Components per vertex, 1 to 4.
    pub size: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
}

impl Attribute {
    pub const POSITION: Attribute = Attribute::new(AttributeKey::Position, 3, ComponentType::Float);
    pub const NORMAL: Attribute = Attribute::new(AttributeKey::Normal, 3, ComponentType::Float);
    pub const TANGENT: Attribute = Attribute::new(AttributeKey::Tangent, 3, ComponentType::Float);
    pub const BITANGENT: Attribute = Attribute::new(AttributeKey::Bitangent, 3, ComponentType::Float);
    pub const UV: Attribute = Attribute::new(AttributeKey::Uv, 2, ComponentType::Float);

    pub const MATERIAL_INDEX: Attribute =
        Attribute::new(AttributeKey::MaterialIndex, 1, ComponentType::Short);
    pub const MATERIAL_ENABLED: Attribute =
        Attribute::new(AttributeKey::MaterialEnabled, 1, ComponentType::UnsignedShort);
    pub const AMBIENT: Attribute = Attribute::new(AttributeKey::Ambient, 3, ComponentType::Float);
    pub const DIFFUSE: Attribute = Attribute::new(AttributeKey::Diffuse, 3, ComponentType::Float);
    pub const SPECULAR: Attribute = Attribute::new(AttributeKey::Specular, 3, ComponentType::Float);
    pub const SPECULAR_EXPONENT: Attribute =
        Attribute::new(AttributeKey::SpecularExponent, 1, ComponentType::Float);
    pub const EMISSIVE: Attribute = Attribute::new(AttributeKey::Emissive, 3, ComponentType::Float);
    pub const TRANSMISSION_FILTER: Attribute =
        Attribute::new(AttributeKey::TransmissionFilter, 3, ComponentType::Float);
    pub const DISSOLVE: Attribute = Attribute::new(AttributeKey::Dissolve, 1, ComponentType::Float);
    pub const ILLUMINATION: Attribute =
        Attribute::new(AttributeKey::Illumination, 1, ComponentType::UnsignedShort);
    pub const REFRACTION_INDEX: Attribute =
        Attribute::new(AttributeKey::RefractionIndex, 1, ComponentType::Float);
    pub const SHARPNESS: Attribute = Attribute::new(AttributeKey::Sharpness, 1, ComponentType::Float);
    pub const ANTI_ALIASING: Attribute =
        Attribute::new(AttributeKey::AntiAliasing, 1, ComponentType::UnsignedShort);

    pub const fn new(key: AttributeKey, size: usize, component_type: ComponentType) -> Self {
        Self {
            key,
            size,
            component_type,
            normalized: false,
        }
    }

    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size * self.component_type.size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub attribute: Attribute,
    pub offset: usize,
}

/// Byte offsets of each attribute inside one interleaved vertex record.
///
/// Every offset is a multiple of its component size and the stride is a
/// multiple of the largest component size in the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    entries: Vec<LayoutEntry>,
    stride: usize,
}

impl Layout {
    pub fn new(attributes: &[Attribute]) -> Result<Self, LayoutError> {
        if attributes.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(attributes.len());
        let mut offset = 0;
        let mut max_component_size = 0;

        for attribute in attributes {
            if !seen.insert(attribute.key) {
                return Err(LayoutError::DuplicateAttribute(attribute.key));
            }
            if !(1..=4).contains(&attribute.size) {
                return Err(LayoutError::ComponentCount {
                    key: attribute.key,
                    size: attribute.size,
                });
            }

            let component_size = attribute.component_type.size();
            if offset % component_size != 0 {
                offset += component_size - offset % component_size;
                log::warn!("layout requires padding before {} attribute", attribute.key);
            }
            entries.push(LayoutEntry {
                attribute: *attribute,
                offset,
            });
            offset += attribute.size_in_bytes();
            max_component_size = max_component_size.max(component_size);
        }

        if offset % max_component_size != 0 {
            offset += max_component_size - offset % max_component_size;
            log::warn!("layout requires padding at the back");
        }

        Ok(Self {
            entries,
            stride: offset,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn get(&self, key: AttributeKey) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.attribute.key == key)
    }

    pub fn offset_of(&self, key: AttributeKey) -> Option<usize> {
        self.get(key).map(|e| e.offset)
    }

    /// Serializes every vertex of `mesh` into one interleaved buffer.
    ///
    /// Material fields of a vertex without a bound material record are
    /// left zeroed and counted in `skipped`.
    pub fn pack(&self, mesh: &Mesh) -> PackedVertices {
        let vertex_count = mesh.vertex_count();
        let mut data = vec![0u8; self.stride * vertex_count];
        let mut skipped = 0;
        let mut reported = HashSet::new();
        let mut missing = Vec::new();

        for vertex in 0..vertex_count {
            let base = vertex * self.stride;
            for entry in &self.entries {
                let attribute = &entry.attribute;
                let Some(values) = attribute_values(mesh, vertex, attribute.key) else {
                    skipped += 1;
                    let material = mesh.material_indices.get(vertex).copied().flatten();
                    if reported.insert((material, attribute.key)) {
                        let name = material
                            .and_then(|i| mesh.material_names.get(i))
                            .map(String::as_str)
                            .unwrap_or("<none>");
                        log::warn!(
                            "material `{}` not found in mesh, skipping {} for its vertices",
                            name,
                            attribute.key
                        );
                        missing.push((name.to_string(), attribute.key));
                    }
                    continue;
                };

                let component_size = attribute.component_type.size();
                for (c, value) in values.iter().take(attribute.size).enumerate() {
                    let at = base + entry.offset + c * component_size;
                    attribute.component_type.write(
                        attribute.normalized,
                        *value,
                        &mut data[at..at + component_size],
                    );
                }
            }
        }

        PackedVertices {
            data,
            vertex_count,
            stride: self.stride,
            skipped,
            missing,
        }
    }
}

/// Output of [`Layout::pack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedVertices {
    pub data: Vec<u8>,
    pub vertex_count: usize,
    pub stride: usize,
    /// Number of (vertex, attribute) pairs skipped for a missing material.
    pub skipped: usize,
    /// Each (material, attribute) pair that was skipped, in first-seen order.
    pub missing: Vec<(String, AttributeKey)>,
}

impl PackedVertices {
    /// Bytes of one vertex record.
    pub fn vertex(&self, index: usize) -> &[u8] {
        &self.data[index * self.stride..(index + 1) * self.stride]
    }

    /// Reads `N` consecutive `f32` components starting at `offset`.
    pub fn read_f32<const N: usize>(&self, index: usize, offset: usize) -> [f32; N] {
        let record = self.vertex(index);
        let mut out = [0.0; N];
        for (c, value) in out.iter_mut().enumerate() {
            let at = offset + c * 4;
            *value = f32::from_le_bytes([record[at], record[at + 1], record[at + 2], record[at + 3]]);
        }
        out
    }
}

fn vec3_at(values: &[f32], vertex: usize) -> [f32; 4] {
    match values.get(vertex * 3..vertex * 3 + 3) {
        Some(v) => [v[0], v[1], v[2], 0.0],
        None => [0.0; 4],
    }
}

fn scalar(v: f32) -> [f32; 4] {
    [v, 0.0, 0.0, 0.0]
}

/// Source values of one attribute for one vertex, `None` when the
/// attribute needs a material record the vertex does not have.
fn attribute_values(mesh: &Mesh, vertex: usize, key: AttributeKey) -> Option<[f32; 4]> {
    let values = match key {
        AttributeKey::Position => vec3_at(&mesh.positions, vertex),
        AttributeKey::Normal => vec3_at(&mesh.normals, vertex),
        AttributeKey::Tangent => vec3_at(&mesh.tangents, vertex),
        AttributeKey::Bitangent => vec3_at(&mesh.bitangents, vertex),
        AttributeKey::Uv => {
            let stride = mesh.texture_stride;
            let mut out = [0.0; 4];
            if let Some(uv) = mesh.uvs.get(vertex * stride..vertex * stride + stride) {
                out[..stride].copy_from_slice(uv);
            }
            out
        }
        AttributeKey::MaterialIndex => {
            let index = mesh.material_indices.get(vertex).copied().flatten();
            scalar(index.map_or(-1.0, |i| i as f32))
        }
        AttributeKey::MaterialEnabled => {
            scalar(if mesh.vertex_material(vertex).is_some() { 1.0 } else { 0.0 })
        }
        key => mesh.vertex_material(vertex)?.field(key)?,
    };
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn read_f32(data: &[u8], at: usize) -> f32 {
        f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    fn read_i16(data: &[u8], at: usize) -> i16 {
        i16::from_le_bytes([data[at], data[at + 1]])
    }

    fn triangle() -> Mesh {
        Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            material_names: vec!["red".into(), "blue".into()],
            material_indices: vec![None, Some(0), Some(1)],
            ..Mesh::new()
        }
    }

    #[test]
    fn test_position_material_index_stride() {
        let layout = Layout::new(&[Attribute::POSITION, Attribute::MATERIAL_INDEX]).unwrap();
        assert_eq!(layout.offset_of(AttributeKey::Position), Some(0));
        assert_eq!(layout.offset_of(AttributeKey::MaterialIndex), Some(12));
        assert_eq!(layout.stride(), 16);
    }

    #[test]
    fn test_padding_before_wider_attribute() {
        let layout = Layout::new(&[Attribute::MATERIAL_INDEX, Attribute::POSITION]).unwrap();
        assert_eq!(layout.offset_of(AttributeKey::MaterialIndex), Some(0));
        assert_eq!(layout.offset_of(AttributeKey::Position), Some(4));
        assert_eq!(layout.stride(), 16);
    }

    #[test]
    fn test_stride_uses_largest_component() {
        let layout = Layout::new(&[Attribute::MATERIAL_ENABLED, Attribute::ILLUMINATION]).unwrap();
        assert_eq!(layout.offset_of(AttributeKey::Illumination), Some(2));
        assert_eq!(layout.stride(), 4);

        let bytes = Attribute::new(AttributeKey::Diffuse, 3, ComponentType::UnsignedByte);
        let layout = Layout::new(&[bytes]).unwrap();
        assert_eq!(layout.stride(), 3);
    }

    #[test]
    fn test_alignment_invariants() {
        let layout = Layout::new(&[
            Attribute::MATERIAL_ENABLED,
            Attribute::new(AttributeKey::Diffuse, 3, ComponentType::UnsignedByte),
            Attribute::NORMAL,
            Attribute::MATERIAL_INDEX,
            Attribute::UV,
        ])
        .unwrap();
        for entry in layout.entries() {
            assert_eq!(entry.offset % entry.attribute.component_type.size(), 0);
        }
        assert_eq!(layout.stride() % 4, 0);
        assert_eq!(layout.offset_of(AttributeKey::Normal), Some(8));
    }

    #[test]
    fn test_duplicate_attribute() {
        assert_eq!(
            Layout::new(&[Attribute::POSITION, Attribute::NORMAL, Attribute::POSITION]),
            Err(LayoutError::DuplicateAttribute(AttributeKey::Position))
        );
        let err = LayoutError::DuplicateAttribute(AttributeKey::MaterialIndex);
        assert_eq!(err.to_string(), "found duplicate attribute: materialIndex");
    }

    #[test]
    fn test_invalid_layouts() {
        assert_eq!(Layout::new(&[]), Err(LayoutError::Empty));
        let wide = Attribute::new(AttributeKey::Position, 5, ComponentType::Float);
        assert!(matches!(Layout::new(&[wide]), Err(LayoutError::ComponentCount { size: 5, .. })));
    }

    #[test]
    fn test_pack_geometry_and_material_index() {
        let layout = Layout::new(&[Attribute::POSITION, Attribute::MATERIAL_INDEX, Attribute::NORMAL])
            .unwrap();
        let packed = layout.pack(&triangle());
        assert_eq!(packed.vertex_count, 3);
        assert_eq!(packed.data.len(), 3 * layout.stride());

        let stride = layout.stride();
        assert_eq!(read_f32(&packed.data, stride), 1.0);
        assert_eq!(read_i16(&packed.data, 12), -1);
        assert_eq!(read_i16(&packed.data, stride + 12), 0);
        assert_eq!(read_i16(&packed.data, 2 * stride + 12), 1);
        let normal_z = 2 * stride + layout.offset_of(AttributeKey::Normal).unwrap() + 8;
        assert_eq!(read_f32(&packed.data, normal_z), 1.0);
        assert_eq!(packed.skipped, 0);

        let normal = layout.offset_of(AttributeKey::Normal).unwrap();
        assert_eq!(packed.read_f32::<3>(1, 0), [1.0, 0.0, 0.0]);
        assert_eq!(packed.read_f32::<3>(2, normal), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_material_is_skipped() {
        let mut mesh = triangle();
        mesh.add_material_library(vec![Material::new("blue").with_diffuse([0.25, 0.5, 1.0])]);
        let layout = Layout::new(&[Attribute::DIFFUSE, Attribute::MATERIAL_ENABLED]).unwrap();
        let packed = layout.pack(&mesh);

        // vertex 0 has no material, vertex 1 references `red` which is unbound
        assert_eq!(packed.skipped, 2);
        assert_eq!(read_f32(&packed.data, 0), 0.0);
        assert_eq!(read_f32(&packed.data, layout.stride()), 0.0);
        let blue = 2 * layout.stride();
        assert_eq!(read_f32(&packed.data, blue + 4), 0.5);
        assert_eq!(read_i16(&packed.data, blue + 12), 1);
        assert_eq!(read_i16(&packed.data, layout.stride() + 12), 0);
    }

    #[test]
    fn test_every_skipped_attribute_is_reported() {
        let mut mesh = triangle();
        mesh.add_material_library(vec![Material::new("blue")]);
        let layout = Layout::new(&[Attribute::DIFFUSE, Attribute::AMBIENT]).unwrap();
        let packed = layout.pack(&mesh);

        assert_eq!(packed.skipped, 4);
        assert_eq!(
            packed.missing,
            vec![
                ("<none>".to_string(), AttributeKey::Diffuse),
                ("<none>".to_string(), AttributeKey::Ambient),
                ("red".to_string(), AttributeKey::Diffuse),
                ("red".to_string(), AttributeKey::Ambient),
            ]
        );
    }

    #[test]
    fn test_normalized_integer_components() {
        let mut mesh = triangle();
        mesh.add_material_library(vec![Material::new("blue").with_diffuse([1.0, 0.5, 0.0])]);
        let color = Attribute::new(AttributeKey::Diffuse, 3, ComponentType::UnsignedByte).normalized();
        let layout = Layout::new(&[color]).unwrap();
        let packed = layout.pack(&mesh);
        assert_eq!(&packed.data[6..9], &[255, 128, 0]);
    }

    #[test]
    fn test_missing_optional_arrays_pack_as_zero() {
        let layout = Layout::new(&[Attribute::TANGENT, Attribute::UV]).unwrap();
        let packed = layout.pack(&triangle());
        assert!(packed.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_uv_packing() {
        let mut mesh = triangle();
        mesh.uvs = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let layout = Layout::new(&[Attribute::UV]).unwrap();
        let packed = layout.pack(&mesh);
        assert_eq!(read_f32(&packed.data, 8), 1.0);
        assert_eq!(read_f32(&packed.data, 2 * 8 + 4), 1.0);
    }
}
