use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::StorageError;
use crate::metrics::{FILES_SAVED, SAVE_FAILURES};
use crate::sanitizer::folder_name_for;

// Generated responses under a fixed root:
// <root>/query-<sanitized prompt>/response-<8 hex chars>.txt
// Directories are never removed; random file names keep writers apart
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    // Creates the root and its parents. Startup only; failure is fatal
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::CreateRoot {
            path: root.clone(),
            source,
        })?;
        tracing::info!("[ContentStore] storage root: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_content_directory(&self, message: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(folder_name_for(message));
        // create_dir_all is a no-op for an existing directory, so racing requests are fine
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    // an id collision overwrites the older file
    pub async fn write_response(
        &self,
        content: &str,
        directory: &Path,
    ) -> Result<PathBuf, StorageError> {
        let path = directory.join(format!("response-{}.txt", short_id()));
        fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    // directory + write, with metrics and logging
    pub async fn persist(&self, message: &str, content: &str) -> Result<PathBuf, StorageError> {
        let result = match self.ensure_content_directory(message).await {
            Ok(dir) => self.write_response(content, &dir).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(path) => {
                FILES_SAVED.inc();
                tracing::debug!("[ContentStore] saved {}", path.display());
            }
            Err(e) => {
                SAVE_FAILURES.inc();
                tracing::warn!("[ContentStore] save failed: {}", e);
            }
        }
        result
    }
}

// first 8 hex chars of a v4 uuid
fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
