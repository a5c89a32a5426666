/// Scene description documents
///
/// A document is a TOML tree of elements whose leaf values are attribute
/// strings in the declarative convention:
///
/// ```toml
/// [scene]
/// background = "20 20 40"
///
/// [[camera]]
/// camera-position = "0 0 30"
/// navigation-type = "object"
///
/// [directed-light]
/// direction = "0 -1 -1"
///
/// [[transform]]
/// rotation = "0 45 0"
///
///   [[transform.shape]]
///   appearance = { color = "255 0 0" }
///   box = { size = "4 4 4" }
/// ```
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::attributes::RawAttributes;
use crate::error::SceneError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SceneDocument {
    #[serde(default)]
    pub scene: RawAttributes,
    #[serde(default, rename = "camera")]
    pub cameras: Vec<RawAttributes>,
    #[serde(default)]
    pub directed_light: Option<RawAttributes>,
    #[serde(default, rename = "transform")]
    pub transforms: Vec<TransformElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransformElement {
    #[serde(default, rename = "transform")]
    pub children: Vec<TransformElement>,
    #[serde(default, rename = "shape")]
    pub shapes: Vec<ShapeElement>,
    #[serde(flatten)]
    pub attributes: RawAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShapeElement {
    #[serde(default)]
    pub appearance: Option<RawAttributes>,
    #[serde(default)]
    pub indexed_face_set: Option<RawAttributes>,
    #[serde(default, rename = "box")]
    pub box_shape: Option<RawAttributes>,
}

impl SceneDocument {
    pub fn parse(text: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
