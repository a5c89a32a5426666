/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Vector3;
use scenic_core::{algebra, light, AttributeKey, DrawCall, Scene};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Vertices closer to the camera plane than this are not drawn.
const MIN_CLIP_W: f32 = 1e-4;

/// A vertex after projection: screen position, NDC depth and shaded colour.
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    color: Vector3<f32>,
}

/// ASCII renderer that rasterizes scene draw calls into terminal cells
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<[u8; 3]>,
    background: [u8; 3],
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![[0; 3]; size],
            background: [0; 3],
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    /// Viewport aspect ratio, correcting for cells being about twice as
    /// tall as they are wide.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / (self.height.max(1) as f32 * 2.0)
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(self.background);
    }

    /// Clears to the scene background and draws every attached object.
    pub fn render_scene(&mut self, scene: &Scene) {
        let [r, g, b, _] = scene.background();
        self.background = [r, g, b].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        self.clear();

        let layout = scene.layout();
        let (Some(position), Some(normal)) = (
            layout.offset_of(AttributeKey::Position),
            layout.offset_of(AttributeKey::Normal),
        ) else {
            log::warn!("scene layout lacks position or normal, nothing to draw");
            return;
        };

        for call in scene.draw_calls() {
            self.render_call(&call, scene, position, normal);
        }
    }

    fn render_call(&mut self, call: &DrawCall, scene: &Scene, position: usize, normal: usize) {
        let vertices: Vec<Option<ScreenVertex>> = (0..call.vertices.vertex_count)
            .map(|i| {
                let p = Vector3::from(call.vertices.read_f32::<3>(i, position));
                let n = Vector3::from(call.vertices.read_f32::<3>(i, normal));
                let rgb = &call.colors[i * 3..i * 3 + 3];
                let base = Vector3::new(rgb[0], rgb[1], rgb[2]).map(|c| c as f32 / 255.0);
                let lit = light::light_factor(scene.light(), &call.normal_matrix, &n);
                self.project(&call.render_matrix, &p, base.component_mul(&lit))
            })
            .collect();

        for [i0, i1, i2] in call.mesh.triangles() {
            // Triangles crossing the camera plane are dropped whole
            if let (Some(v0), Some(v1), Some(v2)) = (vertices[i0], vertices[i1], vertices[i2]) {
                self.rasterize_triangle(&[v0, v1, v2]);
            }
        }
    }

    fn project(
        &self,
        render_matrix: &algebra::Mat4,
        p: &Vector3<f32>,
        color: Vector3<f32>,
    ) -> Option<ScreenVertex> {
        let clip = algebra::transform_point(render_matrix, p);
        if clip.w < MIN_CLIP_W {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(ScreenVertex {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth: ndc.z,
            color,
        })
    }

    fn rasterize_triangle(&mut self, v: &[ScreenVertex; 3]) {
        let [v0, v1, v2] = v;

        // Counter-clockwise in NDC is clockwise once y points down; cull the rest
        let area = (v1.x - v0.x) * (v2.y - v0.y) - (v2.x - v0.x) * (v1.y - v0.y);
        if area >= 0.0 {
            return;
        }

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                if !(-1.0..=1.0).contains(&depth) {
                    continue;
                }

                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    let color = v0.color * w0 + v1.color * w1 + v2.color * w2;
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = shade(&color);
                    self.color_buffer[idx] = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8).into();
                }
            }
        }
    }

    /// The character grid as text, one line per row.
    pub fn frame_text(&self) -> String {
        let mut text = String::with_capacity((self.width + 1) * self.height);
        for row in self.char_buffer.chunks(self.width.max(1)) {
            text.extend(row);
            text.push('\n');
        }
        text
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let [br, bg, bb] = self.background;
        writer.queue(SetBackgroundColor(Color::Rgb { r: br, g: bg, b: bb }))?;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let [r, g, b] = self.color_buffer[idx];
                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Maps shaded colour luminance to a ramp character.
fn shade(color: &Vector3<f32>) -> char {
    let luminance = (0.299 * color.x + 0.587 * color.y + 0.114 * color.z).clamp(0.0, 1.0);
    let char_index = (luminance * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
