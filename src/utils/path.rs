//! Path normalization utilities.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Whether two paths name the same file, comparing normalized forms.
pub fn same_file(a: &Path, b: &Path) -> bool {
    normalize_path(a) == normalize_path(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chat.html");
        std::fs::write(&file, "").unwrap();

        let dotted = dir.path().join(".").join("chat.html");
        assert_eq!(normalize_path(&dotted), file.canonicalize().unwrap());
    }

    #[test]
    fn test_normalize_missing_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.html");
        assert_eq!(normalize_path(&missing), missing);
    }

    #[test]
    fn test_normalize_missing_relative_path() {
        let relative = Path::new("no-such-dir/chat.html");
        let normalized = normalize_path(relative);
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("no-such-dir/chat.html"));
    }

    #[test]
    fn test_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chat.html");
        std::fs::write(&file, "").unwrap();

        assert!(same_file(&file, &dir.path().join("./chat.html")));
        assert!(!same_file(&file, &dir.path().join("other.html")));
    }
}
