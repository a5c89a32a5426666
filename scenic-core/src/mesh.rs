/// Deduplicated triangle mesh produced by the importer and the primitives
use std::collections::HashMap;

use crate::algebra::{normalize, Vec3};
use crate::error::ImportError;
use crate::material::Material;

/// Below this UV determinant a triangle's tangent frame uses `r = 1`.
const UV_DETERMINANT_EPSILON: f32 = 1e-4;

/// How reconstructed face normals are written into shared vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalStrategy {
    /// Each triangle overwrites its corners; a shared vertex keeps the
    /// normal of the last triangle that touched it.
    #[default]
    Overwrite,
    /// Face normals are summed per vertex and the sum is normalized.
    AccumulateNormalize,
}

/// How per-triangle tangent frames are combined per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TangentStrategy {
    /// Plain sum of the orthonormalized contributions.
    #[default]
    Sum,
    /// Sum followed by a per-vertex normalization.
    SumNormalize,
}

/// Flat, GPU-ready vertex arrays plus a triangle index list.
///
/// `positions` and `normals` hold 3 floats per vertex, `uvs` holds
/// `texture_stride` floats per vertex or is empty. Every entry of
/// `indices` is a valid vertex index and the list length is a multiple
/// of 3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub texture_stride: usize,
    pub indices: Vec<u32>,
    /// Triangle indices split per material, only filled when the
    /// importer was asked to group indices by material.
    pub material_groups: Vec<Vec<u32>>,
    /// Material index of each vertex, `None` before the first `usemtl`.
    pub material_indices: Vec<Option<usize>>,
    pub material_names: Vec<String>,
    pub materials_by_index: HashMap<usize, Material>,
    pub tangents: Vec<f32>,
    pub bitangents: Vec<f32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            texture_stride: 2,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_column_slice(&self.positions[index * 3..index * 3 + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        Vec3::from_column_slice(&self.normals[index * 3..index * 3 + 3])
    }

    pub fn uv(&self, index: usize) -> (f32, f32) {
        let base = index * self.texture_stride;
        (self.uvs[base], self.uvs[base + 1])
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
    }

    /// Axis-aligned bounding box as (min, max), `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = (0..self.vertex_count()).map(|i| self.position(i));
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p))))
    }

    /// Unit normal of triangle `(i0, i1, i2)`: `(p2 - p1) x (p0 - p1)`,
    /// so a counter-clockwise triangle seen from +Z faces +Z.
    pub fn face_normal(&self, [i0, i1, i2]: [usize; 3]) -> Vec3 {
        let p1 = self.position(i1);
        normalize(&(self.position(i2) - p1).cross(&(self.position(i0) - p1)))
    }

    fn write_normal(&mut self, index: usize, n: &Vec3) {
        self.normals[index * 3..index * 3 + 3].copy_from_slice(n.as_slice());
    }

    /// Rebuilds every vertex normal from the triangle faces.
    pub fn recompute_normals(&mut self, strategy: NormalStrategy) {
        self.normals = vec![0.0; self.positions.len()];
        let faces: Vec<[usize; 3]> = self.triangles().collect();

        for triangle in faces {
            let face = self.face_normal(triangle);
            for i in triangle {
                match strategy {
                    NormalStrategy::Overwrite => self.write_normal(i, &face),
                    NormalStrategy::AccumulateNormalize => {
                        let sum = self.normal(i) + face;
                        self.write_normal(i, &sum);
                    }
                }
            }
        }

        if strategy == NormalStrategy::AccumulateNormalize {
            for i in 0..self.vertex_count() {
                let n = normalize(&self.normal(i));
                self.write_normal(i, &n);
            }
        }
    }

    /// Computes per-vertex tangents and bitangents from UV derivatives.
    ///
    /// Each triangle's frame is Gram-Schmidt orthogonalized against the
    /// normal of every corner and added into that corner's slot.
    pub fn compute_tangents(&mut self, strategy: TangentStrategy) -> Result<(), ImportError> {
        if self.positions.is_empty() {
            return Err(ImportError::MissingAttributes("positions"));
        }
        if self.normals.len() != self.positions.len() {
            return Err(ImportError::MissingAttributes("normals"));
        }
        if !self.has_uvs() {
            return Err(ImportError::MissingAttributes("texture coordinates"));
        }

        let mut tangents = vec![Vec3::zeros(); self.vertex_count()];
        let mut bitangents = vec![Vec3::zeros(); self.vertex_count()];

        for [i0, i1, i2] in self.triangles() {
            let p0 = self.position(i0);
            let delta_pos1 = self.position(i1) - p0;
            let delta_pos2 = self.position(i2) - p0;

            let uv0 = self.uv(i0);
            let uv1 = self.uv(i1);
            let uv2 = self.uv(i2);
            let delta_uv1 = (uv1.0 - uv0.0, uv1.1 - uv0.1);
            let delta_uv2 = (uv2.0 - uv0.0, uv2.1 - uv0.1);

            let det = delta_uv1.0 * delta_uv2.1 - delta_uv1.1 * delta_uv2.0;
            let r = if det.abs() < UV_DETERMINANT_EPSILON {
                1.0
            } else {
                1.0 / det
            };

            let tangent = (delta_pos1 * delta_uv2.1 - delta_pos2 * delta_uv1.1) * r;
            let bitangent = (delta_pos2 * delta_uv1.0 - delta_pos1 * delta_uv2.0) * r;

            for i in [i0, i1, i2] {
                let n = self.normal(i);
                tangents[i] += normalize(&(tangent - n * n.dot(&tangent)));
                bitangents[i] += normalize(&(bitangent - n * n.dot(&bitangent)));
            }
        }

        if strategy == TangentStrategy::SumNormalize {
            for v in tangents.iter_mut().chain(bitangents.iter_mut()) {
                *v = normalize(v);
            }
        }

        self.tangents = tangents.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        self.bitangents = bitangents.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        Ok(())
    }

    /// Binds material records to the indices assigned by `usemtl` lines.
    /// Records whose name the mesh never references are ignored.
    pub fn add_material_library(&mut self, materials: impl IntoIterator<Item = Material>) {
        for material in materials {
            if let Some(index) = self.material_names.iter().position(|n| *n == material.name) {
                self.materials_by_index.insert(index, material);
            }
        }
    }

    /// Material record of a vertex, if it has one bound.
    pub fn vertex_material(&self, vertex: usize) -> Option<&Material> {
        let index = self.material_indices.get(vertex).copied().flatten()?;
        self.materials_by_index.get(&index)
    }

    /// Index list narrowed to 16 bits for backends that draw with
    /// unsigned short indices.
    pub fn index_buffer(&self) -> Result<Vec<u16>, ImportError> {
        self.indices
            .iter()
            .map(|&i| u16::try_from(i).map_err(|_| ImportError::IndexOverflow(i)))
            .collect()
    }
}
