use std::sync::Arc;

use scenic_core::algebra::{self, Vec3};
use scenic_core::light;
use scenic_core::{
    AttributeKey, MemorySource, MeshSource, NavigationKey, Scene, SceneDocument, SceneError,
};

const CUBE_OBJ: &str = "\
# unit cube, positions only
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
f 1 2 3 4
f 6 5 8 7
f 5 1 4 8
f 2 6 7 3
f 4 3 7 8
f 5 6 2 1
";

const SCENE: &str = r#"
[scene]
background = "0 0 0 255"

[[camera]]
camera-position = "0 0 20"
navigation-type = "object"

[directed-light]
direction = "0 0 -1"

[[transform]]
translation = "-3 0 0"

  [[transform.shape]]
  appearance = { color = "200 50 50" }
  box = { size = "2 2 2" }

[[transform]]
translation = "3 0 0"
rotation = "0 0 0"

  [[transform.shape]]
  appearance = { color = "50 200 50" }
  indexed-face-set = { model = "cube.obj", dedup = "full", normals = "overwrite" }
"#;

fn load_scene() -> Scene {
    let source: Arc<dyn MeshSource> = Arc::new(MemorySource::new().with("cube.obj", CUBE_OBJ));
    let document = SceneDocument::parse(SCENE).unwrap();
    let mut scene = Scene::from_document(&document, source, 4.0 / 3.0).unwrap();
    scene.wait_all().unwrap();
    scene
}

#[test]
fn test_document_to_draw_calls() {
    let scene = load_scene();
    assert_eq!(scene.background(), [0.0, 0.0, 0.0, 1.0]);

    let calls = scene.draw_calls();
    assert_eq!(calls.len(), 2);

    // box primitive is attached immediately, the imported cube after it
    assert_eq!(calls[0].mesh.vertex_count(), 36);
    assert_eq!(calls[1].mesh.triangle_count(), 12);
    assert_eq!(calls[1].mesh.vertex_count(), 8);

    for call in &calls {
        assert_eq!(call.mesh.indices.len() % 3, 0);
        let count = call.mesh.vertex_count() as u32;
        assert!(call.mesh.indices.iter().all(|&i| i < count));
        assert_eq!(call.colors.len(), call.mesh.vertex_count() * 3);
        assert_eq!(call.vertices.vertex_count, call.mesh.vertex_count());
    }
}

#[test]
fn test_objects_project_inside_the_frustum() {
    let scene = load_scene();
    for call in scene.draw_calls() {
        for i in 0..call.mesh.vertex_count() {
            let clip = algebra::transform_point(&call.render_matrix, &call.mesh.position(i));
            assert!(clip.w > 0.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0 && ndc.z.abs() < 1.0, "{ndc}");
        }
    }
}

#[test]
fn test_packed_buffer_matches_mesh() {
    let scene = load_scene();
    let layout = scene.layout();
    let position = layout.offset_of(AttributeKey::Position).unwrap();
    let normal = layout.offset_of(AttributeKey::Normal).unwrap();

    for call in scene.draw_calls() {
        for i in 0..call.mesh.vertex_count() {
            assert_eq!(Vec3::from(call.vertices.read_f32::<3>(i, position)), call.mesh.position(i));
            assert_eq!(Vec3::from(call.vertices.read_f32::<3>(i, normal)), call.mesh.normal(i));
        }
    }
}

#[test]
fn test_front_faces_are_lit() {
    let scene = load_scene();
    let light = scene.light();
    let call = scene.draw_calls()[0];
    let front = light::light_factor(light, &call.normal_matrix, &Vec3::z());
    let back = light::light_factor(light, &call.normal_matrix, &-Vec3::z());
    assert!(front.x > back.x);
    assert!((back.x - 100.0 / 255.0).abs() < 1e-5);
}

#[test]
fn test_navigation_moves_every_object() {
    let mut scene = load_scene();
    let before: Vec<_> = scene.draw_calls().iter().map(|c| c.render_matrix).collect();
    scene.navigate(NavigationKey::Right, false).unwrap();
    let after: Vec<_> = scene.draw_calls().iter().map(|c| c.render_matrix).collect();
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).norm() > 1e-3);
    }
}

#[test]
fn test_box_without_appearance_fails() {
    let text = r#"
[[camera]]

[[transform]]
  [[transform.shape]]
  box = { size = "1 1 1" }
"#;
    let document = SceneDocument::parse(text).unwrap();
    let err = Scene::from_document(&document, Arc::new(MemorySource::new()), 1.0).unwrap_err();
    assert!(matches!(err, SceneError::MissingElement { element: "appearance", .. }));
    assert_eq!(err.to_string(), "shape is missing required element `appearance`");
}

#[test]
fn test_bundled_demo_scene() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../scenes/demo.toml");
    let mut scene = Scene::load(path, 2.0).unwrap();
    assert_eq!(scene.objects().len(), 2);
    scene.wait_all().unwrap();

    let objects = scene.objects();
    assert_eq!(objects.len(), 3);
    let cube = objects[2].mesh();
    assert_eq!(cube.vertex_count(), 24);
    assert_eq!(cube.triangle_count(), 12);
    assert_eq!(cube.material_names, vec!["front", "sides"]);
    assert!(cube.has_tangents());

    let nested = objects[1].transform;
    assert_eq!(nested.translation, Vec3::new(3.0, 3.0, 0.0));
    assert_eq!(nested.scale, Vec3::new(0.5, 0.5, 0.5));
}
