/// Mesh source retrieval and off-thread import
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use futures::channel::oneshot;

use crate::error::LoadError;
use crate::mesh::Mesh;
use crate::obj::{self, ImportOptions};

/// Resolves a mesh identifier (a path, a name) to its source text.
pub trait MeshSource: Send + Sync {
    fn fetch(&self, id: &str) -> Result<String, LoadError>;
}

/// Reads mesh sources from files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MeshSource for FileSource {
    fn fetch(&self, id: &str) -> Result<String, LoadError> {
        let path = self.root.join(id);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(id.to_string()),
            _ => LoadError::Io {
                id: id.to_string(),
                source: e,
            },
        })
    }
}

/// In-memory sources, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(id.into(), text.into());
    }
}

impl MeshSource for MemorySource {
    fn fetch(&self, id: &str) -> Result<String, LoadError> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(id.to_string()))
    }
}

/// Fetches and imports one mesh on the calling thread.
pub fn load_mesh(source: &dyn MeshSource, id: &str, options: &ImportOptions) -> Result<Mesh, LoadError> {
    let text = source.fetch(id)?;
    let mesh = obj::import(&text, options).map_err(|source| LoadError::Import {
        id: id.to_string(),
        source,
    })?;
    log::debug!(
        "loaded `{}`: {} vertices, {} triangles",
        id,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// An import running on a worker thread, resolved exactly once.
#[derive(Debug)]
pub struct PendingMesh {
    id: String,
    receiver: oneshot::Receiver<Result<Mesh, LoadError>>,
}

impl PendingMesh {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the result if the import has finished, without blocking.
    pub fn try_take(&mut self) -> Option<Result<Mesh, LoadError>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(LoadError::Canceled(self.id.clone()))),
        }
    }

    /// Blocks until the import has finished.
    pub fn wait(self) -> Result<Mesh, LoadError> {
        pollster::block_on(self.receiver).unwrap_or_else(|_| Err(LoadError::Canceled(self.id)))
    }
}

/// Starts importing `id` on a worker thread.
pub fn spawn_import(source: Arc<dyn MeshSource>, id: &str, options: ImportOptions) -> PendingMesh {
    let (sender, receiver) = oneshot::channel();
    let worker_id = id.to_string();

    let spawned = thread::Builder::new()
        .name(format!("import-{id}"))
        .spawn(move || {
            let result = load_mesh(source.as_ref(), &worker_id, &options);
            if sender.send(result).is_err() {
                log::debug!("import of `{}` finished after its shape was dropped", worker_id);
            }
        });
    if let Err(e) = spawned {
        log::warn!("failed to start import thread for `{}`: {}", id, e);
    }

    PendingMesh {
        id: id.to_string(),
        receiver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("tri", TRIANGLE);
        assert_eq!(source.fetch("tri").unwrap(), TRIANGLE);
        assert!(matches!(source.fetch("missing"), Err(LoadError::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_file_source_not_found() {
        let source = FileSource::new(std::env::temp_dir());
        assert!(matches!(
            source.fetch("scenic-core-no-such-mesh.obj"),
            Err(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_source_reads_relative_to_root() {
        let dir = std::env::temp_dir().join(format!("scenic-core-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("tri.obj"), TRIANGLE).unwrap();

        let mesh = load_mesh(&FileSource::new(&dir), "tri.obj", &ImportOptions::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_mesh_wraps_import_errors() {
        let source = MemorySource::new().with("empty", "");
        match load_mesh(&source, "empty", &ImportOptions::default()) {
            Err(LoadError::Import { id, source }) => {
                assert_eq!(id, "empty");
                assert_eq!(source, ImportError::EmptySource);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_spawn_import_resolves_once() {
        let source: Arc<dyn MeshSource> = Arc::new(MemorySource::new().with("tri", TRIANGLE));
        let pending = spawn_import(source, "tri", ImportOptions::default());
        assert_eq!(pending.id(), "tri");
        let mesh = pending.wait().unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_try_take_eventually_delivers() {
        let source: Arc<dyn MeshSource> = Arc::new(MemorySource::new().with("tri", TRIANGLE));
        let mut pending = spawn_import(source, "tri", ImportOptions::default());
        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            thread::yield_now();
        };
        assert_eq!(result.unwrap().triangle_count(), 1);
    }

    #[test]
    fn test_spawn_import_reports_errors() {
        let source: Arc<dyn MeshSource> = Arc::new(MemorySource::new());
        let pending = spawn_import(source, "missing", ImportOptions::default());
        assert!(matches!(pending.wait(), Err(LoadError::NotFound(_))));
    }
}
