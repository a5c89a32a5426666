/// Error types for the scene core
use std::fmt;
use std::io;

use thiserror::Error;

use crate::layout::AttributeKey;

/// Errors from the matrix helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgebraError {
    #[error("matrix is singular (zero determinant)")]
    Singular,
}

/// The raw section of a mesh source a face corner refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Vertex,
    Normal,
    Texture,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Vertex => write!(f, "vertex (v)"),
            Section::Normal => write!(f, "normal (vn)"),
            Section::Texture => write!(f, "texture (vt)"),
        }
    }
}

/// Errors raised while importing a mesh source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("mesh source is empty")]
    EmptySource,

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: face has {count} corners, at least 3 are required")]
    TooFewCorners { line: usize, count: usize },

    #[error("line {line}: face references {section} #{index} but no {section} lines were declared")]
    MissingSection {
        line: usize,
        section: Section,
        index: usize,
    },

    #[error("line {line}: {section} index {index} is out of range (1..={available})")]
    IndexOutOfRange {
        line: usize,
        section: Section,
        index: usize,
        available: usize,
    },

    #[error("cannot compute tangents: mesh has no {0}")]
    MissingAttributes(&'static str),

    #[error("index {0} does not fit into a 16-bit index buffer")]
    IndexOverflow(u32),
}

/// Errors from building a vertex layout
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("found duplicate attribute: {0}")]
    DuplicateAttribute(AttributeKey),

    #[error("attribute {key} has {size} components, expected 1 to 4")]
    ComponentCount { key: AttributeKey, size: usize },

    #[error("layout has no attributes")]
    Empty,
}

/// A declarative attribute failed validation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid attribute `{attribute}` on {node}: {reason}")]
pub struct AttributeError {
    pub node: String,
    pub attribute: String,
    pub reason: String,
}

impl AttributeError {
    pub fn new(node: &str, attribute: &str, reason: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors from retrieving mesh source text
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read `{id}`: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },

    #[error("mesh source `{0}` not found")]
    NotFound(String),

    #[error("mesh source `{id}`: {source}")]
    Import {
        id: String,
        #[source]
        source: ImportError,
    },

    #[error("import of `{0}` was dropped before it completed")]
    Canceled(String),
}

/// Errors surfaced while building or drawing a scene
#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("{node} is missing required element `{element}`")]
    MissingElement { node: &'static str, element: &'static str },

    #[error("failed to parse scene document: {0}")]
    Document(#[from] toml::de::Error),

    #[error("failed to read scene document: {0}")]
    Io(#[from] io::Error),
}
