//! Local filesystem store for preserved artifacts.

use std::path::{Component, Path, PathBuf};

use super::{is_stored, ArchivedFormat, ArtifactKind};
use crate::errors::AppError;
use crate::models::Link;

/// Stores artifacts under `<root>/archives/<collectionId>/<linkId><suffix>`.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the root directory when missing.
    pub fn open(root: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(root)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Relative path recorded on the link for an artifact.
    pub fn relative_path(collection_id: i64, link_id: i64, format: ArchivedFormat) -> String {
        format!(
            "archives/{}/{}{}",
            collection_id,
            link_id,
            format.file_suffix()
        )
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, AppError> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if relative.is_empty() || escapes {
            return Err(AppError::Storage(format!(
                "Refusing artifact path outside storage: {}",
                relative
            )));
        }
        Ok(self.root.join(path))
    }

    pub async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Stored artifact {} ({} bytes)", relative, bytes.len());
        Ok(())
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                format!("Artifact {} not found", relative),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, relative: &str) -> Result<(), AppError> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every stored artifact of `link`; failures are logged, not returned.
    pub async fn remove_link_artifacts(&self, link: &Link) {
        for kind in ArtifactKind::ALL {
            let value = kind.value(link);
            if !is_stored(value) {
                continue;
            }
            if let Some(relative) = value {
                if let Err(e) = self.remove(relative).await {
                    tracing::warn!("Failed to remove artifact {} of link {}: {}", relative, link.id, e);
                }
            }
        }
    }
}
