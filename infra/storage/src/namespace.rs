use crate::engine::Storage;
use crate::error::StorageError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Validated namespace directory name: lowercase ASCII alphanumerics and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(pub String);

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.to_ascii_lowercase();

        if name.is_empty() {
            return Err(StorageError::PathTraversalAttempt {
                message: "<empty>".into(),
                context: Some("Namespace cannot be empty".into()),
            });
        }

        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(StorageError::PathTraversalAttempt {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A [`Storage`] view rooted at `<root>/<namespace>/`.
///
/// Shares compression, sharding and the append lock with its parent and is cheap to clone.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    namespace: Arc<str>,
}

impl NamespacedStorage {
    pub(crate) fn new(storage: Storage, namespace: String) -> Self {
        Self { storage, namespace: Arc::from(namespace) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace
    }

    /// Path of `path` relative to the store root, as a `/`-joined string.
    ///
    /// Only valid without sharding; this is the form stored in records and URLs.
    #[must_use]
    pub fn key(&self, path: &str) -> String {
        format!("{}/{}", self.namespace, path.trim_start_matches('/'))
    }

    /// See [`Storage::resolve`]. Sharding applies when enabled.
    ///
    /// # Errors
    /// Same as [`Storage::resolve`].
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.storage.locate(Some(&self.namespace), path)
    }

    /// See [`Storage::read`].
    ///
    /// # Errors
    /// Same as [`Storage::read`].
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.storage.read_at(Some(&self.namespace), path).await
    }

    /// See [`Storage::write`].
    ///
    /// # Errors
    /// Same as [`Storage::write`].
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_at(Some(&self.namespace), path, data).await
    }

    /// See [`Storage::append`].
    ///
    /// # Errors
    /// Same as [`Storage::append`].
    pub async fn append(&self, path: impl AsRef<Path>, line: &str) -> Result<(), StorageError> {
        self.storage.append_at(Some(&self.namespace), path, line).await
    }

    /// See [`Storage::delete`].
    ///
    /// # Errors
    /// Same as [`Storage::delete`].
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.storage.delete_at(Some(&self.namespace), path).await
    }

    /// See [`Storage::exists`].
    ///
    /// # Errors
    /// Same as [`Storage::exists`].
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.storage.exists_at(Some(&self.namespace), path)
    }

    /// See [`Storage::metadata`].
    ///
    /// # Errors
    /// Same as [`Storage::metadata`].
    pub async fn metadata(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<std::fs::Metadata, StorageError> {
        self.storage.metadata_at(Some(&self.namespace), path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_name_rules() {
        assert_eq!(NamespaceName::try_from("Drawings").expect("valid").0, "drawings");
        assert!(NamespaceName::try_from("").is_err());
        assert!(NamespaceName::try_from("../etc").is_err());
        assert!(NamespaceName::try_from("a/b").is_err());
    }
}
