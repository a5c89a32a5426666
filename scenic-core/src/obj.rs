/// Importer for the line-based polygon mesh format (`v`, `vn`, `vt`, `f`, `usemtl`)
///
/// Faces are fan-triangulated from their first corner: `(0, k-1, k)` for
/// `k` in `2..n`. This is only correct for convex, planar polygons.
use std::collections::HashMap;

use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::{ImportError, Section};
use crate::mesh::{Mesh, NormalStrategy, TangentStrategy};

/// Which corner attributes identify a unique unpacked vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Key on (vertex, texture, normal, material). Corners that agree on
    /// every attribute present share one vertex.
    #[default]
    FullTuple,
    /// Key on (vertex, normal) only. Corners without a normal index are
    /// never shared, which yields faceted normals after reconstruction.
    PositionNormal,
}

/// When face corners are resolved against the raw attribute lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexResolution {
    /// Resolve each face as it is read; forward references are errors.
    #[default]
    Incremental,
    /// Resolve after the whole source has been read.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecomputeNormals {
    /// Only when at least one vertex came without a normal.
    #[default]
    WhenMissing,
    Always,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportOptions {
    pub dedup: DedupPolicy,
    pub resolution: IndexResolution,
    pub recompute_normals: RecomputeNormals,
    pub normal_strategy: NormalStrategy,
    /// Compute tangents and bitangents when normals and UVs are present.
    pub tangents: Option<TangentStrategy>,
    /// Keep a third `w` texture component, defaulting to 0.
    pub enable_w_texture_coord: bool,
    /// Also split the triangle indices into one list per material.
    pub indices_per_material: bool,
}

impl ImportOptions {
    pub fn texture_stride(&self) -> usize {
        if self.enable_w_texture_coord {
            3
        } else {
            2
        }
    }
}

/// A face corner as written: 1-based indices into the raw lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Corner {
    vertex: usize,
    texture: Option<usize>,
    normal: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    vertex: usize,
    texture: Option<usize>,
    normal: Option<usize>,
    material: Option<usize>,
}

#[derive(Debug)]
enum Line<'a> {
    Vertex([f32; 3]),
    Normal([f32; 3]),
    Texture([f32; 3]),
    UseMaterial(&'a str),
    Face(Vec<Corner>),
    Ignored,
}

#[derive(Debug)]
struct PendingFace {
    line: usize,
    corners: Vec<Corner>,
    material: Option<usize>,
    group: usize,
}

/// Raw attribute lists in declaration order.
#[derive(Debug, Default)]
struct RawMeshData {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    textures: Vec<[f32; 3]>,
}

impl RawMeshData {
    fn lookup<'a>(
        list: &'a [[f32; 3]],
        section: Section,
        line: usize,
        index: usize,
    ) -> Result<&'a [f32; 3], ImportError> {
        if list.is_empty() {
            return Err(ImportError::MissingSection {
                line,
                section,
                index,
            });
        }
        index
            .checked_sub(1)
            .and_then(|i| list.get(i))
            .ok_or(ImportError::IndexOutOfRange {
                line,
                section,
                index,
                available: list.len(),
            })
    }
}

/// Parses mesh source text into a deduplicated triangle mesh.
pub fn import(source: &str, options: &ImportOptions) -> Result<Mesh, ImportError> {
    if source.trim().is_empty() {
        return Err(ImportError::EmptySource);
    }

    let mut importer = Importer::new(options);
    for (number, text) in source.lines().enumerate() {
        importer.feed(number + 1, text)?;
    }
    importer.finish()
}

struct Importer<'o> {
    options: &'o ImportOptions,
    raw: RawMeshData,
    positions: Vec<f32>,
    normals: Vec<Option<[f32; 3]>>,
    uvs: Vec<Option<[f32; 3]>>,
    material_indices: Vec<Option<usize>>,
    indices: Vec<u32>,
    groups: Vec<Vec<u32>>,
    keys: HashMap<VertexKey, u32>,
    material_names: Vec<String>,
    material_lookup: HashMap<String, usize>,
    current_material: Option<usize>,
    current_group: usize,
    deferred: Vec<PendingFace>,
    corners_seen: usize,
}

impl<'o> Importer<'o> {
    fn new(options: &'o ImportOptions) -> Self {
        Self {
            options,
            raw: RawMeshData::default(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            material_indices: Vec::new(),
            indices: Vec::new(),
            groups: vec![Vec::new()],
            keys: HashMap::new(),
            material_names: Vec::new(),
            material_lookup: HashMap::new(),
            current_material: None,
            current_group: 0,
            deferred: Vec::new(),
            corners_seen: 0,
        }
    }

    fn feed(&mut self, line: usize, text: &str) -> Result<(), ImportError> {
        match parse_line(line, text, self.options.enable_w_texture_coord)? {
            Line::Vertex(v) => self.raw.positions.push(v),
            Line::Normal(n) => self.raw.normals.push(n),
            Line::Texture(t) => self.raw.textures.push(t),
            Line::UseMaterial(name) => self.use_material(name),
            Line::Face(corners) => {
                let face = PendingFace {
                    line,
                    corners,
                    material: self.current_material,
                    group: self.current_group,
                };
                match self.options.resolution {
                    IndexResolution::Incremental => self.resolve_face(&face)?,
                    IndexResolution::Deferred => self.deferred.push(face),
                }
            }
            Line::Ignored => {}
        }
        Ok(())
    }

    fn use_material(&mut self, name: &str) {
        let index = match self.material_lookup.get(name) {
            Some(&index) => index,
            None => {
                let index = self.material_names.len();
                self.material_names.push(name.to_string());
                self.material_lookup.insert(name.to_string(), index);
                if self.options.indices_per_material && index > 0 {
                    self.groups.push(Vec::new());
                }
                index
            }
        };
        self.current_material = Some(index);
        if self.options.indices_per_material {
            self.current_group = index;
        }
    }

    fn resolve_face(&mut self, face: &PendingFace) -> Result<(), ImportError> {
        let n = face.corners.len();
        for k in 2..n {
            for corner in [face.corners[0], face.corners[k - 1], face.corners[k]] {
                let index = self.resolve_corner(face.line, corner, face.material)?;
                self.indices.push(index);
                self.groups[face.group].push(index);
            }
        }
        Ok(())
    }

    fn resolve_corner(
        &mut self,
        line: usize,
        corner: Corner,
        material: Option<usize>,
    ) -> Result<u32, ImportError> {
        self.corners_seen += 1;

        let key = match self.options.dedup {
            DedupPolicy::FullTuple => Some(VertexKey {
                vertex: corner.vertex,
                texture: corner.texture,
                normal: corner.normal,
                material,
            }),
            DedupPolicy::PositionNormal => corner.normal.map(|normal| VertexKey {
                vertex: corner.vertex,
                texture: None,
                normal: Some(normal),
                material: None,
            }),
        };

        if let Some(&index) = key.as_ref().and_then(|k| self.keys.get(k)) {
            return Ok(index);
        }

        let position = *RawMeshData::lookup(&self.raw.positions, Section::Vertex, line, corner.vertex)?;
        let texture = corner
            .texture
            .map(|i| RawMeshData::lookup(&self.raw.textures, Section::Texture, line, i))
            .transpose()?
            .copied();
        let normal = corner
            .normal
            .map(|i| RawMeshData::lookup(&self.raw.normals, Section::Normal, line, i))
            .transpose()?
            .copied();

        let index = (self.positions.len() / 3) as u32;
        self.positions.extend_from_slice(&position);
        self.uvs.push(texture);
        self.normals.push(normal);
        self.material_indices.push(material);

        if let Some(key) = key {
            self.keys.insert(key, index);
        }
        Ok(index)
    }

    fn finish(mut self) -> Result<Mesh, ImportError> {
        for face in std::mem::take(&mut self.deferred) {
            self.resolve_face(&face)?;
        }

        let stride = self.options.texture_stride();
        let vertex_count = self.positions.len() / 3;
        let missing_normals = self.normals.iter().any(Option::is_none);

        let mut mesh = Mesh {
            positions: self.positions,
            normals: self
                .normals
                .iter()
                .flat_map(|n| n.unwrap_or([0.0; 3]))
                .collect(),
            texture_stride: stride,
            indices: self.indices,
            material_indices: self.material_indices,
            material_names: self.material_names,
            ..Mesh::new()
        };

        if self.uvs.iter().any(Option::is_some) {
            mesh.uvs = self
                .uvs
                .iter()
                .flat_map(|t| t.unwrap_or([0.0; 3])[..stride].to_vec())
                .collect();
        }

        if self.options.indices_per_material {
            mesh.material_groups = self.groups;
        }

        if missing_normals || self.options.recompute_normals == RecomputeNormals::Always {
            log::debug!("reconstructing normals for {} vertices", vertex_count);
            mesh.recompute_normals(self.options.normal_strategy);
        }

        if let Some(strategy) = self.options.tangents {
            if mesh.has_uvs() {
                mesh.compute_tangents(strategy)?;
            } else {
                log::warn!("tangents requested but the mesh has no texture coordinates; skipping");
            }
        }

        log::debug!(
            "imported {} vertices, {} triangles from {} corners",
            vertex_count,
            mesh.triangle_count(),
            self.corners_seen
        );
        Ok(mesh)
    }
}

fn index(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn corner(input: &str) -> IResult<&str, Corner> {
    let (input, vertex) = index(input)?;
    let (input, texture) = opt(preceded(char('/'), opt(index)))(input)?;
    let (input, normal) = opt(preceded(char('/'), index))(input)?;
    Ok((
        input,
        Corner {
            vertex,
            texture: texture.flatten(),
            normal,
        },
    ))
}

fn number(input: &str) -> IResult<&str, f32> {
    float(input)
}

fn parse_components<'a>(
    line: usize,
    keyword: &str,
    fields: impl Iterator<Item = &'a str>,
) -> Result<Vec<f32>, ImportError> {
    fields
        .map(|field| {
            all_consuming(number)(field)
                .ok()
                .map(|(_, value)| value)
                .filter(|value| value.is_finite())
                .ok_or_else(|| ImportError::Syntax {
                    line,
                    message: format!("`{keyword}` has a non-numeric component `{field}`"),
                })
        })
        .collect()
}

fn require_components(
    line: usize,
    keyword: &str,
    components: &[f32],
    required: usize,
) -> Result<(), ImportError> {
    if components.len() < required {
        return Err(ImportError::Syntax {
            line,
            message: format!(
                "`{keyword}` needs {required} components, found {}",
                components.len()
            ),
        });
    }
    Ok(())
}

fn parse_line(line: usize, text: &str, w_coord: bool) -> Result<Line<'_>, ImportError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(Line::Ignored);
    }

    let mut fields = text.split_whitespace();
    let keyword = fields.next().unwrap_or_default();

    match keyword {
        "v" | "vn" => {
            let c = parse_components(line, keyword, fields)?;
            require_components(line, keyword, &c, 3)?;
            let v = [c[0], c[1], c[2]];
            Ok(if keyword == "v" {
                Line::Vertex(v)
            } else {
                Line::Normal(v)
            })
        }
        "vt" => {
            let c = parse_components(line, keyword, fields)?;
            require_components(line, keyword, &c, 1)?;
            let w = if w_coord { c.get(2).copied().unwrap_or(0.0) } else { 0.0 };
            Ok(Line::Texture([c[0], c.get(1).copied().unwrap_or(0.0), w]))
        }
        "usemtl" => fields
            .next()
            .map(Line::UseMaterial)
            .ok_or_else(|| ImportError::Syntax {
                line,
                message: "`usemtl` without a material name".to_string(),
            }),
        "f" => {
            let corners = fields
                .map(|field| {
                    all_consuming(corner)(field)
                        .map(|(_, c)| c)
                        .map_err(|_| ImportError::Syntax {
                            line,
                            message: format!("invalid face corner `{field}`"),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if corners.len() < 3 {
                return Err(ImportError::TooFewCorners {
                    line,
                    count: corners.len(),
                });
            }
            Ok(Line::Face(corners))
        }
        _ => Ok(Line::Ignored),
    }
}
