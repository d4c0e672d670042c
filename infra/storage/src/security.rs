use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Lexically folds `.` and `..`. A `..` that would climb above the root is rejected.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for c in path.components() {
        match c {
            Component::CurDir => {},
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(StorageError::PathTraversalAttempt {
                        message: path.display().to_string().into(),
                        context: Some("Path attempted to escape sandbox via '..'".into()),
                    });
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathTraversalAttempt {
                    message: path.display().to_string().into(),
                    context: Some("Absolute paths are not allowed in sandbox".into()),
                });
            },
        }
    }

    Ok(out)
}

/// Joins `path` to `root`, refusing anything that ends up outside it.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();

    if path.is_absolute() {
        return Err(StorageError::PathTraversalAttempt {
            message: format!("Absolute paths are not allowed in sandbox {}", path.display()).into(),
            context: None,
        });
    }

    let safe_rel = normalize_relative(path)?;
    let joined = root.join(safe_rel);

    match joined.canonicalize() {
        Ok(canonical) => validate_canonical(root, canonical),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_path(root, &joined),
        Err(e) => Err(StorageError::Io { source: e, context: None }),
    }
}

/// Resolves `path` inside an optional namespace directory.
///
/// With `sharding`, the file lands in `<ns>/<dirs>/<c0c1>/<c2c3>/<name>` for names of at
/// least four characters. Subdirectories in `path` are kept either way.
pub(crate) fn resolve_scoped(
    root: &Path,
    ns: Option<&str>,
    path: impl AsRef<Path>,
    sharding: bool,
) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    let filename =
        path.file_name().and_then(|s| s.to_str()).ok_or_else(|| StorageError::FileNotFound {
            message: path.display().to_string().into(),
            context: Some("Target must be a file".into()),
        })?;

    let mut scoped = PathBuf::new();
    if let Some(n) = ns {
        scoped.push(n);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        scoped.push(parent);
    }

    if sharding {
        let mut chars = filename.chars();
        let first: String = chars.by_ref().take(2).collect();
        let second: String = chars.take(2).collect();
        if second.chars().count() == 2 {
            scoped.push(first);
            scoped.push(second);
        }
    }
    scoped.push(filename);

    resolve_path(root, scoped)
}

fn validate_canonical(root: &Path, canonical: PathBuf) -> Result<PathBuf, StorageError> {
    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        Err(StorageError::PathTraversalAttempt {
            message: canonical.display().to_string().into(),
            context: Some("Path attempted to escape sandbox via .. sequences".into()),
        })
    }
}

/// Checks a not-yet-existing path through its nearest existing ancestor, which must
/// canonicalize inside `root` (a symlinked directory pointing out is rejected).
fn validate_path(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    if !joined.starts_with(root) {
        return Err(StorageError::PathTraversalAttempt {
            message: joined.display().to_string().into(),
            context: Some("Path is outside sandbox boundaries".into()),
        });
    }

    let mut current = Some(joined);

    while let Some(path) = current {
        if path == root {
            return Ok(joined.to_path_buf());
        }

        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(canonical) => Err(StorageError::PathTraversalAttempt {
                    message: canonical.display().to_string().into(),
                    context: Some("Existing parent directory is a symlink outside sandbox".into()),
                }),
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = path.parent();
    }

    Err(StorageError::PathTraversalAttempt {
        message: joined.display().to_string().into(),
        context: Some("No valid parent directory found within sandbox".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots_inside_root() {
        let out = normalize_relative(Path::new("drawings/./x/../a.png")).expect("stays inside");
        assert_eq!(out, Path::new("drawings/a.png"));
        assert!(normalize_relative(Path::new("../a.png")).is_err());
        assert!(normalize_relative(Path::new("a/../../b")).is_err());
    }

    #[test]
    fn test_scoped_layout_with_and_without_sharding() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().canonicalize().expect("canonical root");

        let flat = resolve_scoped(&root, Some("drawings"), "abcdef.png", false).expect("flat");
        assert_eq!(flat, root.join("drawings/abcdef.png"));

        let sharded = resolve_scoped(&root, Some("drawings"), "abcdef.png", true).expect("sharded");
        assert_eq!(sharded, root.join("drawings/ab/cd/abcdef.png"));

        let short = resolve_scoped(&root, None, "abc", true).expect("short name");
        assert_eq!(short, root.join("abc"));
    }
}
