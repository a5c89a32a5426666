/// Scene context: typed nodes, attached shapes and per-frame draw calls
use std::path::Path;
use std::sync::Arc;

use crate::algebra::{self, Mat3, Mat4, Vec3};
use crate::attributes::{self, AttributeBag};
use crate::config::{SceneDocument, ShapeElement, TransformElement};
use crate::error::SceneError;
use crate::geometry;
use crate::layout::{Attribute, Layout, PackedVertices};
use crate::light::DirectedLight;
use crate::loader::{self, FileSource, MeshSource, PendingMesh};
use crate::material::Color;
use crate::mesh::Mesh;
use crate::projection::{Camera, Navigation, NavigationKey};
use crate::transform::TransformNode;

/// Vertex attributes uploaded for every scene object.
pub const SCENE_ATTRIBUTES: [Attribute; 3] = [
    Attribute::POSITION,
    Attribute::NORMAL,
    Attribute::MATERIAL_INDEX,
];

/// Object rotation per navigation step, in degrees.
const OBJECT_STEP_DEGREES: f32 = 5.0;
/// Camera rotation per navigation step, in degrees.
const CAMERA_STEP_DEGREES: f32 = 1.0;

/// A shape whose mesh has been delivered and uploaded.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub transform: TransformNode,
    pub color: Color,
    mesh: Mesh,
    colors: Vec<u8>,
    vertices: PackedVertices,
}

impl SceneObject {
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Per-vertex RGB colours, 3 bytes per vertex.
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn vertices(&self) -> &PackedVertices {
        &self.vertices
    }
}

#[derive(Debug)]
struct PendingShape {
    transform: TransformNode,
    color: Color,
    mesh: PendingMesh,
}

/// Everything a backend needs to draw one object.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub render_matrix: Mat4,
    pub normal_matrix: Mat3,
    pub mesh: &'a Mesh,
    pub vertices: &'a PackedVertices,
    pub colors: &'a [u8],
}

#[derive(Debug)]
pub struct Scene {
    background: [f32; 4],
    cameras: Vec<Camera>,
    active_camera: usize,
    light: Option<DirectedLight>,
    layout: Layout,
    objects: Vec<SceneObject>,
    pending: Vec<PendingShape>,
}

impl Scene {
    /// Empty scene viewed through `camera`, unlit, white background.
    pub fn new(camera: Camera) -> Result<Self, SceneError> {
        Ok(Self {
            background: [1.0, 1.0, 1.0, 0.0],
            cameras: vec![camera],
            active_camera: 0,
            light: None,
            layout: Layout::new(&SCENE_ATTRIBUTES)?,
            objects: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// Builds a scene from a document. Indexed face sets start importing
    /// in the background and are attached by [`Scene::attach_ready`] or
    /// [`Scene::wait_all`].
    pub fn from_document(
        document: &SceneDocument,
        source: Arc<dyn MeshSource>,
        aspect: f32,
    ) -> Result<Self, SceneError> {
        if document.cameras.is_empty() {
            return Err(SceneError::MissingElement {
                node: "scene",
                element: "camera",
            });
        }
        let cameras = document
            .cameras
            .iter()
            .map(|raw| attributes::camera_node(&AttributeBag::new("camera", raw), aspect))
            .collect::<Result<Vec<_>, _>>()?;
        let active_camera = cameras.iter().position(|c| c.active).unwrap_or(0);

        let mut scene = Self {
            background: attributes::background(&AttributeBag::new("scene", &document.scene))?,
            cameras,
            active_camera,
            light: document
                .directed_light
                .as_ref()
                .map(|raw| attributes::light_node(&AttributeBag::new("directed-light", raw)))
                .transpose()?,
            layout: Layout::new(&SCENE_ATTRIBUTES)?,
            objects: Vec::new(),
            pending: Vec::new(),
        };

        let root = TransformNode::default();
        for element in &document.transforms {
            scene.build_transform(element, &root, &source)?;
        }
        log::debug!(
            "scene built: {} cameras, {} objects, {} imports pending",
            scene.cameras.len(),
            scene.objects.len(),
            scene.pending.len()
        );
        Ok(scene)
    }

    /// Reads a scene document from disk. Models resolve relative to the
    /// document's directory.
    pub fn load(path: impl AsRef<Path>, aspect: f32) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let document = SceneDocument::load(path)?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_document(&document, Arc::new(FileSource::new(root)), aspect)
    }

    /// A lit scene showing a single mesh, centred and framed by an
    /// object-navigation camera.
    pub fn viewer(mesh: Mesh, aspect: f32) -> Result<Self, SceneError> {
        let (lo, hi) = mesh.bounds().unwrap_or((Vec3::zeros(), Vec3::zeros()));
        let center = (lo + hi) / 2.0;
        let radius = ((hi - lo).norm() / 2.0).max(1.0);

        let mut camera = Camera::new(aspect);
        camera.position = Vec3::new(0.0, 0.0, radius * 2.5);
        camera.z_far = camera.z_far.max(radius * 10.0);
        camera.navigation = Navigation::Object;
        camera.update()?;

        let mut scene = Self::new(camera)?;
        scene.light = Some(DirectedLight::default());
        let transform = TransformNode::new(-center, Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        scene.add_object(transform, mesh, Color::WHITE);
        Ok(scene)
    }

    fn build_transform(
        &mut self,
        element: &TransformElement,
        parent: &TransformNode,
        source: &Arc<dyn MeshSource>,
    ) -> Result<(), SceneError> {
        let local = attributes::transform_node(&AttributeBag::new("transform", &element.attributes))?;
        let node = parent.child(&local);

        for child in &element.children {
            self.build_transform(child, &node, source)?;
        }
        for shape in &element.shapes {
            self.build_shape(shape, node, source)?;
        }
        Ok(())
    }

    fn build_shape(
        &mut self,
        element: &ShapeElement,
        transform: TransformNode,
        source: &Arc<dyn MeshSource>,
    ) -> Result<(), SceneError> {
        let appearance = element
            .appearance
            .as_ref()
            .ok_or(SceneError::MissingElement {
                node: "shape",
                element: "appearance",
            })?;
        let color = attributes::color_node(&AttributeBag::new("appearance", appearance))?;

        if let Some(raw) = &element.indexed_face_set {
            if element.box_shape.is_some() {
                log::warn!("shape declares both indexed-face-set and box, using indexed-face-set");
            }
            let bag = AttributeBag::new("indexed-face-set", raw);
            let model = bag.required("model")?;
            let options = attributes::import_options(&bag)?;
            self.pending.push(PendingShape {
                transform,
                color,
                mesh: loader::spawn_import(Arc::clone(source), model, options),
            });
        } else if let Some(raw) = &element.box_shape {
            let size = attributes::box_size(&AttributeBag::new("box", raw))?;
            self.add_object(transform, geometry::box_mesh(&size), color);
        } else {
            return Err(SceneError::MissingElement {
                node: "shape",
                element: "indexed-face-set or box",
            });
        }
        Ok(())
    }

    /// Uploads a mesh and makes it drawable.
    pub fn add_object(&mut self, transform: TransformNode, mesh: Mesh, color: Color) {
        let vertices = self.layout.pack(&mesh);
        let colors = color.vertex_colors(mesh.vertex_count());
        self.objects.push(SceneObject {
            transform,
            color,
            mesh,
            colors,
            vertices,
        });
    }

    /// Attaches every shape whose import has finished, without blocking.
    ///
    /// Returns how many shapes were attached. A failed import is removed
    /// from the pending list and its error returned.
    pub fn attach_ready(&mut self) -> Result<usize, SceneError> {
        let mut attached = 0;
        let mut i = 0;
        while i < self.pending.len() {
            let Some(result) = self.pending[i].mesh.try_take() else {
                i += 1;
                continue;
            };
            let shape = self.pending.remove(i);
            self.add_object(shape.transform, result?, shape.color);
            attached += 1;
        }
        Ok(attached)
    }

    /// Blocks until every pending import has been attached.
    pub fn wait_all(&mut self) -> Result<(), SceneError> {
        for shape in std::mem::take(&mut self.pending) {
            let mesh = shape.mesh.wait()?;
            self.add_object(shape.transform, mesh, shape.color);
        }
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    pub fn light(&self) -> Option<&DirectedLight> {
        self.light.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn active_camera(&self) -> &Camera {
        &self.cameras[self.active_camera]
    }

    pub fn active_camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active_camera]
    }

    /// Updates every camera for a resized viewport.
    pub fn set_aspect(&mut self, aspect: f32) {
        for camera in &mut self.cameras {
            camera.set_aspect(aspect);
        }
    }

    /// Applies one navigation step for the active camera's navigation
    /// type. Returns whether anything moved.
    pub fn navigate(&mut self, key: NavigationKey, modifier: bool) -> Result<bool, SceneError> {
        let camera = &mut self.cameras[self.active_camera];
        match camera.navigation {
            Navigation::None => Ok(false),
            Navigation::Object => {
                let step = algebra::radians(OBJECT_STEP_DEGREES);
                let rotation = match key {
                    NavigationKey::Right => Vec3::new(0.0, step, 0.0),
                    NavigationKey::Left => Vec3::new(0.0, -step, 0.0),
                    NavigationKey::Up => Vec3::new(-step, 0.0, 0.0),
                    NavigationKey::Down => Vec3::new(step, 0.0, 0.0),
                    NavigationKey::PageDown => Vec3::new(0.0, 0.0, step),
                    NavigationKey::PageUp => Vec3::new(0.0, 0.0, -step),
                    NavigationKey::Home => {
                        camera.move_local(&Vec3::new(0.0, 0.0, -1.0))?;
                        return Ok(true);
                    }
                    NavigationKey::End => {
                        camera.move_local(&Vec3::new(0.0, 0.0, 1.0))?;
                        return Ok(true);
                    }
                };
                for object in &mut self.objects {
                    object.transform.rotate(&rotation);
                }
                Ok(true)
            }
            Navigation::Camera if modifier => {
                let step = algebra::radians(CAMERA_STEP_DEGREES);
                let rotation = match key {
                    NavigationKey::Right => Vec3::new(0.0, -step, 0.0),
                    NavigationKey::Left => Vec3::new(0.0, step, 0.0),
                    NavigationKey::Up => Vec3::new(step, 0.0, 0.0),
                    NavigationKey::Down => Vec3::new(-step, 0.0, 0.0),
                    NavigationKey::PageDown => Vec3::new(0.0, 0.0, -step),
                    NavigationKey::PageUp => Vec3::new(0.0, 0.0, step),
                    NavigationKey::Home | NavigationKey::End => return Ok(false),
                };
                camera.rotate(&rotation)?;
                Ok(true)
            }
            Navigation::Camera => {
                let direction = match key {
                    NavigationKey::Right => Vec3::new(1.0, 0.0, 0.0),
                    NavigationKey::Left => Vec3::new(-1.0, 0.0, 0.0),
                    NavigationKey::Up => Vec3::new(0.0, 1.0, 0.0),
                    NavigationKey::Down => Vec3::new(0.0, -1.0, 0.0),
                    NavigationKey::End => Vec3::new(0.0, 0.0, 1.0),
                    NavigationKey::Home => Vec3::new(0.0, 0.0, -1.0),
                    NavigationKey::PageUp | NavigationKey::PageDown => return Ok(false),
                };
                camera.move_local(&direction)?;
                Ok(true)
            }
        }
    }

    /// One draw call per attached object, in attach order.
    pub fn draw_calls(&self) -> Vec<DrawCall<'_>> {
        let camera = self.active_camera();
        self.objects
            .iter()
            .map(|object| DrawCall {
                render_matrix: object
                    .transform
                    .render_matrix(camera.camera_matrix(), camera.projection_matrix()),
                normal_matrix: object.transform.normal_matrix(),
                mesh: &object.mesh,
                vertices: &object.vertices,
                colors: &object.colors,
            })
            .collect()
    }
}
