//! Asset File Server
//!
//! Serves generated files from a single root directory under
//! `GET /assets/<name>`. Names are flat file names: anything that could
//! address a path outside the root is rejected before the filesystem is
//! touched, and the canonical path is checked against the canonical root
//! so symlinks cannot escape it either.

pub mod http;

use std::path::{Path, PathBuf};

use tracing::warn;

pub use http::{handle_request, run_asset_server, AssetBody};

/// Result of resolving an asset name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLookup {
    /// Regular file inside the root
    Found { path: PathBuf, len: u64 },
    /// Missing, not a regular file, or outside the root
    NotFound,
    /// Name is not a flat file name
    Invalid,
}

/// Whether `name` is a plain file name with no path semantics
pub fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains(['/', '\\', ':', '\0'])
        && name != "."
}

/// Content type for a file, from its extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
    {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Resolve `name` to a regular file directly inside `root`
pub async fn resolve(root: &Path, name: &str) -> AssetLookup {
    if !is_flat_name(name) {
        return AssetLookup::Invalid;
    }

    let candidate = root.join(name);
    let meta = match tokio::fs::metadata(&candidate).await {
        Ok(meta) if meta.is_file() => meta,
        _ => return AssetLookup::NotFound,
    };

    let (Ok(root), Ok(path)) = (
        tokio::fs::canonicalize(root).await,
        tokio::fs::canonicalize(&candidate).await,
    ) else {
        return AssetLookup::NotFound;
    };

    if !path.starts_with(&root) {
        warn!("Asset {} resolves outside {}", name, root.display());
        return AssetLookup::NotFound;
    }

    AssetLookup::Found {
        path,
        len: meta.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_flat_names() {
        assert!(is_flat_name("report.png"));
        assert!(is_flat_name("clip 01.mp4"));
        assert!(is_flat_name(".hidden"));

        assert!(!is_flat_name(""));
        assert!(!is_flat_name("."));
        assert!(!is_flat_name(".."));
        assert!(!is_flat_name("../../secret.txt"));
        assert!(!is_flat_name("sub/report.png"));
        assert!(!is_flat_name("..\\secret.txt"));
        assert!(!is_flat_name("C:secret.txt"));
        assert!(!is_flat_name("a\0b"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for_path(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.gif")), "image/gif");
        assert_eq!(content_type_for_path(Path::new("a.mp4")), "video/mp4");
        assert_eq!(
            content_type_for_path(Path::new("a.xyz")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for_path(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_resolve_regular_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("report.png"), b"12345").unwrap();

        match resolve(dir.path(), "report.png").await {
            AssetLookup::Found { path, len } => {
                assert_eq!(len, 5);
                assert!(path.ends_with("report.png"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_and_directory() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        assert_eq!(resolve(dir.path(), "missing.xyz").await, AssetLookup::NotFound);
        assert_eq!(resolve(dir.path(), "folder").await, AssetLookup::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        assert_eq!(resolve(&root, "../secret.txt").await, AssetLookup::Invalid);
        assert_eq!(resolve(&root, "..").await, AssetLookup::Invalid);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_out_of_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link.png")).unwrap();

        assert_eq!(resolve(&root, "link.png").await, AssetLookup::NotFound);
    }
}
