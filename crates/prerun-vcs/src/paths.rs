//! Path helpers shared by the backends.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical form of a workspace root.
///
/// A root that cannot be resolved (missing, unreadable) is kept as given.
pub fn normalize_root(root: &Path) -> PathBuf {
    match std::fs::canonicalize(root) {
        Ok(canonical) => canonical,
        Err(e) => {
            debug!("Keeping root {} as given: {}", root.display(), e);
            root.to_path_buf()
        }
    }
}

/// Join a slash-separated repository path onto the root
pub fn absolute(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Path of `path` relative to `root`, with forward slashes and a leading `/`.
///
/// Paths outside the root are returned as they are.
pub fn root_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            format!("/{}", parts.join("/"))
        }
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute() {
        assert_eq!(absolute(Path::new("/ws"), "src/a.rs"), PathBuf::from("/ws/src/a.rs"));
        assert_eq!(absolute(Path::new("/ws"), "/a.rs"), PathBuf::from("/ws/a.rs"));
    }

    #[test]
    fn test_root_relative() {
        assert_eq!(
            root_relative(Path::new("/ws"), Path::new("/ws/src/foo.ts")),
            "/src/foo.ts"
        );
        assert_eq!(root_relative(Path::new("/ws"), Path::new("/other/a")), "/other/a");
    }

    #[test]
    fn test_normalize_root_resolves_relative_and_aliased_paths() {
        let temp = tempfile::TempDir::new().unwrap();
        let canonical = std::fs::canonicalize(temp.path()).unwrap();
        std::fs::create_dir(canonical.join("sub")).unwrap();

        assert_eq!(normalize_root(&canonical.join("sub").join("..")), canonical);

        let cwd = std::fs::canonicalize(".").unwrap();
        let current = normalize_root(Path::new("."));
        assert!(current.is_absolute());
        assert_eq!(current, cwd);
    }

    #[test]
    fn test_normalize_root_keeps_missing_path() {
        let missing = Path::new("/nonexistent/prerun-root");
        assert_eq!(normalize_root(missing), PathBuf::from("/nonexistent/prerun-root"));
    }
}
