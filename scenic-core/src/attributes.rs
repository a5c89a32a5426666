/// Typed reads over declarative node attributes
///
/// Every attribute arrives as a string in the whitespace-separated textual
/// convention (`"0 0 -5"`). `AttributeBag` validates arity and numeric
/// content and the `*_node` functions below turn a bag into the typed node
/// the core works with. Nothing past this module sees raw strings.
use std::collections::BTreeMap;

use crate::algebra::{self, Vec3};
use crate::error::{AttributeError, SceneError};
use crate::geometry::DEFAULT_BOX_SIZE;
use crate::light::DirectedLight;
use crate::material::Color;
use crate::mesh::{NormalStrategy, TangentStrategy};
use crate::obj::{DedupPolicy, ImportOptions, IndexResolution, RecomputeNormals};
use crate::projection::{Camera, Navigation};
use crate::transform::TransformNode;

/// Attribute name to raw value, as read from a scene document.
pub type RawAttributes = BTreeMap<String, String>;

/// Attributes of one node, with the node's name for error messages.
#[derive(Debug, Clone, Copy)]
pub struct AttributeBag<'a> {
    node: &'static str,
    raw: &'a RawAttributes,
}

impl<'a> AttributeBag<'a> {
    pub fn new(node: &'static str, raw: &'a RawAttributes) -> Self {
        Self { node, raw }
    }

    pub fn node(&self) -> &'static str {
        self.node
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.raw.get(name).map(|v| v.trim())
    }

    fn error(&self, name: &str, reason: impl Into<String>) -> AttributeError {
        AttributeError::new(self.node, name, reason)
    }

    pub fn required(&self, name: &str) -> Result<&'a str, AttributeError> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(name, "attribute is required")),
        }
    }

    fn numbers(&self, name: &str, value: &str) -> Result<Vec<f32>, AttributeError> {
        value
            .split_whitespace()
            .map(|field| match field.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(self.error(name, format!("`{field}` is not a real number"))),
            })
            .collect()
    }

    fn exactly<const N: usize>(&self, name: &str, value: &str) -> Result<[f32; N], AttributeError> {
        let values = self.numbers(name, value)?;
        <[f32; N]>::try_from(values.as_slice()).map_err(|_| {
            self.error(
                name,
                format!("expected {N} real numbers, got {}", values.len()),
            )
        })
    }

    /// A single real number.
    pub fn number(&self, name: &str, default: f32) -> Result<f32, AttributeError> {
        match self.get(name) {
            Some(value) => Ok(self.exactly::<1>(name, value)?[0]),
            None => Ok(default),
        }
    }

    /// Three real numbers, `"x y z"`.
    pub fn vec3(&self, name: &str, default: [f32; 3]) -> Result<Vec3, AttributeError> {
        match self.get(name) {
            Some(value) => Ok(Vec3::from(self.exactly::<3>(name, value)?)),
            None => Ok(Vec3::from(default)),
        }
    }

    /// Three angles in degrees, returned in radians.
    pub fn angles(&self, name: &str) -> Result<Vec3, AttributeError> {
        Ok(self.vec3(name, [0.0; 3])?.map(algebra::radians))
    }

    /// An RGB colour of three integers in `0..=255`.
    pub fn rgb(&self, name: &str, default: [u8; 3]) -> Result<[u8; 3], AttributeError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let fields: Vec<&str> = value.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(self.error(
                name,
                format!("expected 3 integers, got {}", fields.len()),
            ));
        }
        let mut rgb = [0u8; 3];
        for (channel, field) in rgb.iter_mut().zip(fields) {
            *channel = field
                .parse()
                .map_err(|_| self.error(name, format!("`{field}` is not an integer in 0..=255")))?;
        }
        Ok(rgb)
    }

    /// `true` or `false`.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, AttributeError> {
        match self.get(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.error(name, format!("expected `true` or `false`, got `{other}`"))),
        }
    }

    /// One keyword out of a fixed set.
    pub fn choice<T: Copy>(
        &self,
        name: &str,
        options: &[(&str, T)],
        default: T,
    ) -> Result<T, AttributeError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        options
            .iter()
            .find(|(keyword, _)| *keyword == value)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                let expected: Vec<&str> = options.iter().map(|(k, _)| *k).collect();
                self.error(
                    name,
                    format!("expected one of {}, got `{value}`", expected.join(", ")),
                )
            })
    }
}

/// Scene clear colour as RGBA in `0..=1`. Three components leave alpha at 0.
pub fn background(bag: &AttributeBag) -> Result<[f32; 4], AttributeError> {
    const NAME: &str = "background";
    let Some(value) = bag.get(NAME) else {
        return Ok([1.0, 1.0, 1.0, 0.0]);
    };
    let values = bag.numbers(NAME, value)?;
    if !(3..=4).contains(&values.len()) {
        return Err(bag.error(
            NAME,
            format!("expected 3 or 4 real numbers, got {}", values.len()),
        ));
    }
    let mut rgba = [0.0; 4];
    for (out, v) in rgba.iter_mut().zip(&values) {
        *out = v / 255.0;
    }
    Ok(rgba)
}

pub fn camera_node(bag: &AttributeBag, aspect: f32) -> Result<Camera, SceneError> {
    let mut camera = Camera::new(aspect);
    camera.field_of_view = bag.number("view-angle", Camera::DEFAULT_FIELD_OF_VIEW)?;
    camera.z_near = bag.number("z-near", Camera::DEFAULT_Z_NEAR)?;
    camera.z_far = bag.number("z-far", Camera::DEFAULT_Z_FAR)?;
    if !(camera.field_of_view > 0.0 && camera.field_of_view < 180.0) {
        return Err(bag
            .error("view-angle", format!("expected 0 < angle < 180, got {}", camera.field_of_view))
            .into());
    }
    if !(camera.z_near > 0.0) {
        return Err(bag
            .error("z-near", format!("expected a positive distance, got {}", camera.z_near))
            .into());
    }
    if !(camera.z_far > camera.z_near) {
        return Err(bag
            .error(
                "z-far",
                format!("must be greater than z-near ({}), got {}", camera.z_near, camera.z_far),
            )
            .into());
    }
    camera.rotation = bag.angles("camera-rotation")?;
    camera.position = bag.vec3("camera-position", [0.0; 3])?;
    camera.navigation = bag.choice(
        "navigation-type",
        &[
            ("object", Navigation::Object),
            ("camera", Navigation::Camera),
            ("none", Navigation::None),
        ],
        Navigation::None,
    )?;
    camera.active = bag.flag("active", false)?;
    camera.update()?;
    Ok(camera)
}

pub fn light_node(bag: &AttributeBag) -> Result<DirectedLight, AttributeError> {
    let ambient = bag.vec3("fon-light-color", DirectedLight::DEFAULT_AMBIENT)?;
    let directed = bag.vec3("directed-light-color", DirectedLight::DEFAULT_DIRECTED)?;
    let direction = bag.vec3("direction", DirectedLight::DEFAULT_DIRECTION)?;
    Ok(DirectedLight::new(ambient.into(), directed.into(), direction))
}

/// Local transform of a node, before inheriting from its parent.
pub fn transform_node(bag: &AttributeBag) -> Result<TransformNode, AttributeError> {
    Ok(TransformNode::new(
        bag.vec3("translation", [0.0; 3])?,
        bag.angles("rotation")?,
        bag.vec3("scale", [1.0; 3])?,
    ))
}

pub fn color_node(bag: &AttributeBag) -> Result<Color, AttributeError> {
    let [r, g, b] = bag.rgb("color", Color::WHITE.rgb)?;
    Ok(Color::new(r, g, b))
}

pub fn box_size(bag: &AttributeBag) -> Result<Vec3, AttributeError> {
    bag.vec3("size", DEFAULT_BOX_SIZE)
}

/// Importer policy for an indexed face set.
pub fn import_options(bag: &AttributeBag) -> Result<ImportOptions, AttributeError> {
    let defaults = ImportOptions::default();
    Ok(ImportOptions {
        dedup: bag.choice(
            "dedup",
            &[
                ("full", DedupPolicy::FullTuple),
                ("position-normal", DedupPolicy::PositionNormal),
            ],
            defaults.dedup,
        )?,
        resolution: bag.choice(
            "resolution",
            &[
                ("incremental", IndexResolution::Incremental),
                ("deferred", IndexResolution::Deferred),
            ],
            defaults.resolution,
        )?,
        recompute_normals: bag.choice(
            "recompute-normals",
            &[
                ("missing", RecomputeNormals::WhenMissing),
                ("always", RecomputeNormals::Always),
            ],
            defaults.recompute_normals,
        )?,
        normal_strategy: bag.choice(
            "normals",
            &[
                ("overwrite", NormalStrategy::Overwrite),
                ("smooth", NormalStrategy::AccumulateNormalize),
            ],
            defaults.normal_strategy,
        )?,
        tangents: bag.choice(
            "tangents",
            &[
                ("sum", Some(TangentStrategy::Sum)),
                ("sum-normalize", Some(TangentStrategy::SumNormalize)),
                ("none", None),
            ],
            defaults.tangents,
        )?,
        enable_w_texture_coord: bag.flag("w-texture-coord", defaults.enable_w_texture_coord)?,
        indices_per_material: bag.flag("indices-per-material", defaults.indices_per_material)?,
    })
}
