use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::StoreError;
use crate::ports::outbound::BackingStore;

/// Path scheme served by `LocalFsBackingStore`.
pub const LOCAL_SCHEME: &str = "local://";

/// Backing store on the local filesystem.
///
/// `local://a/b` maps to `<root>/a/b`. Writes go to a temporary sibling
/// that is fsynced and renamed over the target, so a concurrent reader
/// sees the old object or the new one.
pub struct LocalFsBackingStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl LocalFsBackingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a `local://` path under the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = path
            .strip_prefix(LOCAL_SCHEME)
            .ok_or_else(|| StoreError::UnsupportedScheme {
                path: path.to_string(),
            })?;

        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.as_os_str().is_empty() || escapes {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn io_error(path: &str, err: std::io::Error) -> StoreError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_string(),
            }
        } else {
            StoreError::Io {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl BackingStore for LocalFsBackingStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(path, e))?;
        }

        let suffix = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp = target.with_extension(format!("tmp{}", suffix));

        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        file.sync_all().await.map_err(|e| Self::io_error(path, e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Self::io_error(path, e));
        }

        debug!("[ekv-01] Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| Self::io_error(path, e))
    }
}
