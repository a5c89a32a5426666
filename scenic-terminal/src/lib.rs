/// Terminal front end: draws a scene as ASCII art and maps keys to navigation
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use scenic_core::{NavigationKey, Scene, SceneError};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod renderer;

pub use renderer::AsciiRenderer;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Maps a key to a navigation step; the bool is the modifier state.
pub fn navigation_input(key: &KeyEvent) -> Option<(NavigationKey, bool)> {
    let nav = match key.code {
        KeyCode::Left | KeyCode::Char('a') => NavigationKey::Left,
        KeyCode::Right | KeyCode::Char('d') => NavigationKey::Right,
        KeyCode::Up | KeyCode::Char('w') => NavigationKey::Up,
        KeyCode::Down | KeyCode::Char('s') => NavigationKey::Down,
        KeyCode::PageUp => NavigationKey::PageUp,
        KeyCode::PageDown => NavigationKey::PageDown,
        KeyCode::Home => NavigationKey::Home,
        KeyCode::End => NavigationKey::End,
        _ => return None,
    };
    Some((nav, key.modifiers.contains(KeyModifiers::SHIFT)))
}

/// Main application struct for terminal scene rendering
pub struct TerminalApp {
    scene: Scene,
    renderer: AsciiRenderer,
    frame_time: Duration,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mut scene: Scene, target_fps: u32) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let renderer = AsciiRenderer::new(width as usize, height as usize);
        scene.set_aspect(renderer.aspect());

        Ok(Self {
            scene,
            renderer,
            frame_time: Duration::from_millis(1000 / u64::from(target_fps.max(1))),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            // Shapes whose import finished since the last frame
            self.scene.attach_ready()?;

            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<(), SceneError> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                _ => {
                    if let Some((nav, modifier)) = navigation_input(&key) {
                        self.scene.navigate(nav, modifier)?;
                    }
                }
            },
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.scene.set_aspect(self.renderer.aspect());
            }
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.render_scene(&self.scene);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let loading = match self.scene.pending_count() {
            0 => String::new(),
            n => format!(" | loading {n}"),
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Scenic | FPS: {:.1} | objects: {}{} | Arrows/PgUp/PgDn/Home/End=Navigate Shift=Turn Q=Quit",
                self.fps,
                self.scene.objects().len(),
                loading
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Renders one frame of `scene` as plain text, for non-interactive output.
pub fn render_once(scene: &mut Scene, width: usize, height: usize) -> Result<String, SceneError> {
    scene.wait_all()?;
    let mut renderer = AsciiRenderer::new(width, height);
    scene.set_aspect(renderer.aspect());
    renderer.render_scene(scene);
    Ok(renderer.frame_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_core::{geometry, Camera, Color as ShapeColor, TransformNode};

    #[test]
    fn test_navigation_input() {
        let key = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(navigation_input(&key), Some((NavigationKey::Left, false)));

        let key = KeyEvent::new(KeyCode::PageUp, KeyModifiers::SHIFT);
        assert_eq!(navigation_input(&key), Some((NavigationKey::PageUp, true)));

        let key = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE);
        assert_eq!(navigation_input(&key), Some((NavigationKey::Up, false)));

        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(navigation_input(&key), None);
    }

    #[test]
    fn test_render_once() {
        let mut camera = Camera::new(1.0);
        camera.position = nalgebra::Vector3::new(0.0, 0.0, 8.0);
        camera.update().unwrap();
        let mut scene = Scene::new(camera).unwrap();
        scene.add_object(
            TransformNode::default(),
            geometry::box_mesh(&nalgebra::Vector3::new(2.0, 2.0, 2.0)),
            ShapeColor::WHITE,
        );

        let text = render_once(&mut scene, 30, 10).unwrap();
        assert_eq!(text.lines().count(), 10);
        assert!(text.lines().all(|l| l.chars().count() == 30));
        assert!(text.contains('@'));
    }

    #[test]
    fn test_render_once_with_zero_width() {
        let mut scene = Scene::new(Camera::new(1.0)).unwrap();
        scene.add_object(
            TransformNode::default(),
            geometry::box_mesh(&nalgebra::Vector3::new(2.0, 2.0, 2.0)),
            ShapeColor::WHITE,
        );

        let text = render_once(&mut scene, 0, 5).unwrap();
        assert!(text.trim().is_empty());
        let projection = scene.active_camera().projection_matrix();
        assert!(projection.iter().all(|v| v.is_finite()));
    }
}
