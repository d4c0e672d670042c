use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::namespace::{NamespaceName, NamespacedStorage};
use crate::security;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub(crate) const TMP_MARKER: &str = ".scribetmp.";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(&data).context("LZ4 block is corrupted")
            },
        }
    }
}

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical root; every resolved path starts with it.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    pub(crate) sharding: bool,
    pub(crate) tmp_counter: AtomicU64,
    /// Serializes [`Storage::append`] across the whole store.
    pub(crate) append_lock: Mutex<()>,
}

/// Cloneable handle to a sandboxed storage root.
///
/// ```rust
/// # use scribe_storage::{Storage, StorageError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), StorageError> {
/// # let tmp = tempfile::tempdir().unwrap();
/// let storage = Storage::builder().root(tmp.path()).sharding(false).connect().await?;
/// let drawings = storage.namespace("drawings")?;
/// drawings.write("V1StGXR8_Z5j.png", b"png").await?;
///
/// assert!(storage.exists("drawings/V1StGXR8_Z5j.png")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Scoped view under `<root>/<name>/`.
    ///
    /// Names are lowercased and limited to ASCII alphanumerics and `_`.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] for an empty or illegal name.
    pub fn namespace<N>(&self, name: N) -> Result<NamespacedStorage, StorageError>
    where
        N: TryInto<NamespaceName, Error = StorageError>,
    {
        let ns = name.try_into()?;
        Ok(NamespacedStorage::new(self.clone(), ns.0))
    }

    /// Resolves `path` against the root without sharding.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] for absolute paths or paths that
    /// leave the root, and [`StorageError::Io`] if an existing ancestor cannot be checked.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    pub(crate) fn locate(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, StorageError> {
        security::resolve_scoped(&self.root, namespace, path, self.sharding)
    }

    /// Reads a whole file, decompressing it when compression is enabled.
    ///
    /// # Errors
    /// [`StorageError::FileNotFound`] for a missing file, [`StorageError::Decompress`] for
    /// a corrupted block, or a resolution error.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.read_at(None, path).await
    }

    pub(crate) async fn read_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<Vec<u8>, StorageError> {
        let resolved = self.locate(namespace, path)?;

        let data = fs::read(&resolved).await.map_err(|err| not_found_or_io(err, &resolved, "Read"))?;

        self.compression.decompress(data)
    }

    /// Writes a whole file atomically.
    ///
    /// Bytes go to `<name>.scribetmp.<n>` first, are synced, then renamed over the
    /// target. Missing parent directories are created. Readers never observe a
    /// partially written file.
    ///
    /// # Errors
    /// A resolution error, or [`StorageError::Io`] if any step on disk fails.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.write_at(None, path, data).await
    }

    pub(crate) async fn write_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let resolved = self.locate(namespace, path)?;
        ensure_parent(&resolved).await?;

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);
        let payload = self.compression.compress(data);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&payload).await.context("Write failed")?;
            file.sync_all().await.context("Sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            // Windows refuses to rename over an existing file.
            if err.kind() != ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Rename failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
            fs::remove_file(&resolved)
                .await
                .context(format!("Failed to replace {}", resolved.display()))?;
            fs::rename(&temp, &resolved)
                .await
                .context(format!("Rename failed: {} -> {}", temp.display(), resolved.display()))?;
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File written");
        Ok(())
    }

    /// Appends `line` plus a trailing newline to a file, creating it if needed.
    ///
    /// Appends are serialized store-wide, so concurrent callers never interleave.
    /// The file is synced before the lock is released.
    ///
    /// # Errors
    /// [`StorageError::Unsupported`] when compression is enabled, since a block-compressed
    /// file cannot be extended. Otherwise a resolution or I/O error.
    pub async fn append(&self, path: impl AsRef<Path>, line: &str) -> Result<(), StorageError> {
        self.append_at(None, path, line).await
    }

    pub(crate) async fn append_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
        line: &str,
    ) -> Result<(), StorageError> {
        if self.compression != Compression::None {
            return Err(StorageError::Unsupported {
                message: "append on a compressed store".into(),
                context: None,
            });
        }

        let resolved = self.locate(namespace, path)?;
        ensure_parent(&resolved).await?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line.trim_end_matches(['\r', '\n']));
        record.push('\n');

        let _guard = self.append_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&resolved)
            .await
            .context(format!("Failed to open for append: {}", resolved.display()))?;
        file.write_all(record.as_bytes()).await.context("Append failed")?;
        file.sync_all().await.context("Sync failed")?;

        debug!(path = %resolved.display(), "Line appended");
        Ok(())
    }

    /// Removes a file.
    ///
    /// # Errors
    /// [`StorageError::FileNotFound`] for a missing file, or a resolution or I/O error.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.delete_at(None, path).await
    }

    pub(crate) async fn delete_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        let resolved = self.locate(namespace, path)?;
        fs::remove_file(&resolved).await.map_err(|err| not_found_or_io(err, &resolved, "Delete"))?;
        debug!(path = %resolved.display(), "File deleted");
        Ok(())
    }

    /// Whether a file exists at `path`.
    ///
    /// # Errors
    /// Only resolution errors; a missing file is `Ok(false)`.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.exists_at(None, path)
    }

    pub(crate) fn exists_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<bool, StorageError> {
        Ok(self.locate(namespace, path)?.is_file())
    }

    /// Filesystem metadata. With compression on, `len()` is the on-disk size.
    ///
    /// # Errors
    /// [`StorageError::FileNotFound`] for a missing file, or a resolution or I/O error.
    pub async fn metadata(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<std::fs::Metadata, StorageError> {
        self.metadata_at(None, path).await
    }

    pub(crate) async fn metadata_at(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<std::fs::Metadata, StorageError> {
        let resolved = self.locate(namespace, path)?;
        fs::metadata(&resolved).await.map_err(|err| not_found_or_io(err, &resolved, "Metadata"))
    }

    /// Removes temp files left behind by interrupted writes.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }
}

fn not_found_or_io(err: std::io::Error, path: &Path, op: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::FileNotFound { message: path.display().to_string().into(), context: None }
    } else {
        StorageError::Io {
            source: err,
            context: Some(format!("{op} failed: {}", path.display()).into()),
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create directory {}", parent.display())),
        None => Ok(()),
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => warn!(path = %path.display(), error = %err, "Directory open failed"),
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let n = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("storage");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_path_is_unique_and_marked() {
        let counter = AtomicU64::new(7);
        let target = Path::new("/data/drawings/abc.png");
        let first = unique_tmp_path(target, &counter);
        let second = unique_tmp_path(target, &counter);

        assert_eq!(first, Path::new("/data/drawings/abc.png.scribetmp.7"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_lz4_roundtrip_and_corruption() {
        let packed = Compression::Lz4.compress(b"HELLO HELLO HELLO");
        assert_eq!(Compression::Lz4.decompress(packed).expect("valid block"), b"HELLO HELLO HELLO");

        let err = Compression::Lz4.decompress(vec![1, 2]).unwrap_err();
        assert!(matches!(err, StorageError::Decompress { .. }));
    }
}
