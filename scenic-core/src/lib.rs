/// Scenic Core Library - declarative scenes compiled to draw calls
///
/// This library provides the renderer-independent part of the scene layer:
/// matrix helpers, the mesh importer and vertex layout packer, typed scene
/// nodes and the `Scene` context that turns a scene document into draw calls.

pub mod algebra;
pub mod attributes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod projection;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use config::SceneDocument;
pub use error::{AlgebraError, AttributeError, ImportError, LayoutError, LoadError, SceneError};
pub use layout::{Attribute, AttributeKey, ComponentType, Layout, PackedVertices};
pub use light::DirectedLight;
pub use loader::{FileSource, MemorySource, MeshSource};
pub use material::{Color, Material};
pub use mesh::{Mesh, NormalStrategy, TangentStrategy};
pub use obj::{DedupPolicy, ImportOptions, IndexResolution, RecomputeNormals};
pub use projection::{Camera, Navigation, NavigationKey};
pub use scene::{DrawCall, Scene, SceneObject};
pub use transform::TransformNode;
