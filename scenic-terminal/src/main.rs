/// Scenic Terminal - render a declarative scene or a single mesh as ASCII art
///
/// Controls (depend on the camera's navigation type):
///   - Arrows / WASD: rotate objects, or move the camera
///   - PageUp / PageDown: roll
///   - Home / End: move closer / further
///   - Shift + key: turn the camera instead of moving it
///   - Q/ESC: Quit
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use scenic_core::loader::{self, FileSource};
use scenic_core::{ImportOptions, NormalStrategy, Scene};
use scenic_terminal::{render_once, AppError, TerminalApp};

#[derive(Parser, Debug)]
#[command(name = "scenic-terminal", version, about = "Render 3D scenes in the terminal")]
struct Cli {
    /// Scene document (TOML)
    #[arg(long, conflicts_with = "obj", required_unless_present = "obj")]
    scene: Option<PathBuf>,

    /// Show a single mesh file instead of a scene
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Average shared vertex normals of the mesh given with --obj
    #[arg(long, requires = "obj")]
    smooth: bool,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Print a single frame of the given size (e.g. 80x24) and exit
    #[arg(long, value_parser = parse_size)]
    once: Option<(usize, usize)>,
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let w = w.parse().map_err(|_| format!("invalid width `{w}`"))?;
    let h = h.parse().map_err(|_| format!("invalid height `{h}`"))?;
    Ok((w, h))
}

fn open_mesh(path: &Path, smooth: bool) -> Result<Scene, AppError> {
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let options = ImportOptions {
        normal_strategy: if smooth {
            NormalStrategy::AccumulateNormalize
        } else {
            NormalStrategy::Overwrite
        },
        ..ImportOptions::default()
    };

    let mesh = loader::load_mesh(&FileSource::new(root), &id, &options).map_err(scenic_core::SceneError::from)?;
    log::info!("loaded {}: {} triangles", path.display(), mesh.triangle_count());
    Ok(Scene::viewer(mesh, 1.0)?)
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut scene = match (&cli.scene, &cli.obj) {
        (Some(path), _) => Scene::load(path, 1.0)?,
        (None, Some(path)) => open_mesh(path, cli.smooth)?,
        (None, None) => unreachable!("clap requires --scene or --obj"),
    };

    if let Some((width, height)) = cli.once {
        print!("{}", render_once(&mut scene, width, height)?);
        return Ok(());
    }

    let mut app = TerminalApp::new(scene, cli.fps)?;
    app.run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
