use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace root {path}: {source}")]
    Root { path: PathBuf, source: io::Error },
    #[error("Failed to create workspace {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("Failed to write source file {path}: {source}")]
    WriteSource { path: PathBuf, source: io::Error },
}

/// Hands out one fresh directory per execution under a shared root.
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new<T: AsRef<Path>>(root: T) -> Self {
        Self {
            root: root.as_ref().into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn acquire(&self, source_file_name: &str) -> Result<Workspace, WorkspaceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Root {
                path: self.root.clone(),
                source,
            })?;

        // create_dir (not create_dir_all) fails on an existing path, so two
        // requests can never end up sharing a directory.
        let dir = self.root.join(format!("run_{}", Uuid::new_v4()));
        fs::create_dir(&dir)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: dir.clone(),
                source,
            })?;
        tracing::debug!("Workspace acquired: {}", dir.display());

        Ok(Workspace {
            source_path: dir.join(source_file_name),
            dir,
            released: false,
        })
    }
}

/// Request-scoped directory. Removed by [`Workspace::release`], or on drop if
/// the owner never got that far.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    source_path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub async fn write_source(&self, code: &str) -> Result<(), WorkspaceError> {
        let write_err = |source| WorkspaceError::WriteSource {
            path: self.source_path.clone(),
            source,
        };

        let mut file = fs::File::create(&self.source_path)
            .await
            .map_err(write_err)?;
        file.write_all(code.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }

    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => tracing::debug!("Workspace released: {}", self.dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove workspace {}: {}",
                self.dir.display(),
                e
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!("Workspace removed on drop: {}", self.dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove workspace {}: {}",
                self.dir.display(),
                e
            ),
        }
    }
}
