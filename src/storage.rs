//! Served root
//!
//! Every path a request names is resolved here. Nothing outside the root
//! is ever read or written, symlinks included.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ConfigError, ServiceError};

/// Canonicalized directory that bounds all reads and writes
#[derive(Debug, Clone)]
pub struct ServedRoot {
    path: PathBuf,
}

impl ServedRoot {
    /// Canonicalize `root` and check that it is a directory.
    pub fn open(root: &str) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidRoot {
            path: root.to_string(),
            source,
        };

        let path = std::fs::canonicalize(root).map_err(invalid)?;
        if !path.is_dir() {
            return Err(invalid(io::Error::other("not a directory")));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a decoded URL path to an existing file or directory inside the root.
    pub async fn resolve_existing(&self, url_path: &str) -> Result<PathBuf, ServiceError> {
        let Some(relative) = relative_path(url_path.trim_start_matches('/')) else {
            warn!(path = url_path, "Path traversal attempt blocked");
            return Err(ServiceError::NotFound);
        };

        // File not found is common (404), no need to log at warning level
        let canonical = fs::canonicalize(self.path.join(&relative))
            .await
            .map_err(|_| ServiceError::NotFound)?;

        if !canonical.starts_with(&self.path) {
            warn!(
                path = url_path,
                resolved = %canonical.display(),
                "Symlink escape blocked"
            );
            return Err(ServiceError::NotFound);
        }
        Ok(canonical)
    }

    /// Resolve the name of a file to be written.
    ///
    /// The parent directory must already exist and lie inside the root. An
    /// existing symlink at the target must also point inside the root. A name
    /// ending in a separator names a directory and is refused.
    pub async fn resolve_target(&self, name: &str) -> Result<PathBuf, ServiceError> {
        if name.ends_with(['/', '\\']) {
            return Err(ServiceError::InvalidFileName);
        }
        let relative =
            relative_path(name).ok_or_else(|| ServiceError::PathEscapesRoot(name.to_string()))?;
        let Some(file_name) = relative.file_name().map(ToOwned::to_owned) else {
            return Err(ServiceError::InvalidFileName);
        };

        let parent = match relative.parent() {
            Some(p) if !p.as_os_str().is_empty() => self.path.join(p),
            _ => self.path.clone(),
        };
        let parent = fs::canonicalize(&parent)
            .await
            .map_err(|source| ServiceError::Write {
                path: name.to_string(),
                source,
            })?;
        if !parent.starts_with(&self.path) {
            return Err(ServiceError::PathEscapesRoot(name.to_string()));
        }

        let target = parent.join(file_name);
        if let Ok(meta) = fs::symlink_metadata(&target).await {
            if meta.file_type().is_symlink() {
                let resolved = fs::canonicalize(&target)
                    .await
                    .map_err(|_| ServiceError::PathEscapesRoot(name.to_string()))?;
                if !resolved.starts_with(&self.path) {
                    return Err(ServiceError::PathEscapesRoot(name.to_string()));
                }
            }
        }
        Ok(target)
    }

    /// Write `data` to `name`, replacing any existing file.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf, ServiceError> {
        let target = self.resolve_target(name).await?;
        replace_file(&target, data)
            .await
            .map_err(|source| ServiceError::Write {
                path: name.to_string(),
                source,
            })?;
        debug!(path = %target.display(), bytes = data.len(), "Wrote file");
        Ok(target)
    }
}

/// Write `data` next to `target` and rename it into place.
///
/// The staging file is created exclusively and the rename swaps the directory
/// entry itself, so a symlink planted at `target` after resolution is
/// replaced rather than followed. A parent directory swapped for a symlink
/// after resolution is not covered.
async fn replace_file(target: &Path, data: &[u8]) -> io::Result<()> {
    let staging = staging_path(target);
    let result = async {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&staging, target).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&staging).await;
    }
    result
}

fn staging_path(target: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    let name = target.file_name().unwrap_or_default().to_string_lossy();
    target.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Turn a user supplied path into a relative one made only of normal components.
///
/// Returns `None` for absolute paths, drive prefixes and any `..` segment.
fn relative_path(raw: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_in(dir: &tempfile::TempDir) -> ServedRoot {
        ServedRoot::open(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("a/b.json"), Some(PathBuf::from("a/b.json")));
        assert_eq!(relative_path("./a.json"), Some(PathBuf::from("a.json")));
        assert_eq!(relative_path(""), Some(PathBuf::new()));
        assert_eq!(relative_path("../a.json"), None);
        assert_eq!(relative_path("a/../../b"), None);
        assert_eq!(relative_path("/etc/passwd"), None);
    }

    #[test]
    fn test_open_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(ServedRoot::open(file.to_str().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_write_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let root = root_in(&dir);

        root.write("state.json", br#"{"a":1}"#).await.unwrap();
        root.write("state.json", b"{}").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("state.json")).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_write_into_existing_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("saves")).unwrap();
        let root = root_in(&dir);

        let target = root.write("saves/slot1.json", b"[]").await.unwrap();
        assert!(target.starts_with(root.path()));
        assert_eq!(std::fs::read(dir.path().join("saves/slot1.json")).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_missing_parent_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = root_in(&dir);
        let err = root.write("nope/slot.json", b"[]").await.unwrap_err();
        assert!(matches!(err, ServiceError::Write { .. }));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("www")).unwrap();
        let root = ServedRoot::open(dir.path().join("www").to_str().unwrap()).unwrap();

        for name in ["../escape.json", "/tmp/escape.json", "a/../../escape.json"] {
            let err = root.write(name, b"x").await.unwrap_err();
            assert!(matches!(err, ServiceError::PathEscapesRoot(_)), "{name}");
        }
        assert!(!dir.path().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_root_itself_is_not_a_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = root_in(&dir);
        for name in ["", ".", "./"] {
            let err = root.resolve_target(name).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidFileName), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_trailing_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("saves")).unwrap();
        let root = root_in(&dir);

        for name in ["slot/", "saves/", "saves/slot\\"] {
            let err = root.write(name, b"x").await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidFileName), "{name:?}");
        }
        assert!(!dir.path().join("slot").exists());
        assert!(dir.path().join("saves").is_dir());
    }

    #[tokio::test]
    async fn test_write_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("taken")).unwrap();
        let root = root_in(&dir);

        root.write("state.json", b"{}").await.unwrap();
        assert!(root.write("taken", b"{}").await.is_err());

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["state.json", "taken"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_planted_after_resolve_is_replaced() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let root = root_in(&dir);

        let target = root.resolve_target("slot.json").await.unwrap();
        std::os::unix::fs::symlink(outside.path().join("victim.json"), &target).unwrap();
        replace_file(&target, b"{}").await.unwrap();

        assert!(!outside.path().join("victim.json").exists());
        let meta = std::fs::symlink_metadata(&target).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("victim.json"),
            dir.path().join("victim.json"),
        )
        .unwrap();
        let root = root_in(&dir);

        let err = root.write("link/x.json", b"x").await.unwrap_err();
        assert!(matches!(err, ServiceError::PathEscapesRoot(_)));

        let err = root.write("victim.json", b"x").await.unwrap_err();
        assert!(matches!(err, ServiceError::PathEscapesRoot(_)));
        assert!(!outside.path().join("victim.json").exists());

        assert!(matches!(
            root.resolve_existing("/link").await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_resolve_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<h1>hi</h1>").unwrap();
        let root = root_in(&dir);

        let found = root.resolve_existing("/index.html").await.unwrap();
        assert_eq!(found, root.path().join("index.html"));
        assert_eq!(root.resolve_existing("/").await.unwrap(), root.path());
        assert!(matches!(
            root.resolve_existing("/missing.js").await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            root.resolve_existing("/../etc/passwd").await,
            Err(ServiceError::NotFound)
        ));
    }
}
