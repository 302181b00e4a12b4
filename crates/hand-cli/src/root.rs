use std::path::{Path, PathBuf};

pub const DOCUMENT_NAME: &str = "gestures.json";

/// Resolve the hand document path.
///
/// Priority:
/// 1. `--config` flag / `HAND_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `gestures.json`
/// 3. Fall back to `cwd/gestures.json`
pub fn resolve_document(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd).unwrap_or_else(|| cwd.join(DOCUMENT_NAME))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(DOCUMENT_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?.to_path_buf();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("elsewhere.json");
        assert_eq!(resolve_document(Some(&path)), path);
    }

    #[test]
    fn finds_document_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DOCUMENT_NAME), "{}").unwrap();
        let subdir = dir.path().join("a/b");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_upward(&subdir), Some(dir.path().join(DOCUMENT_NAME)));
    }

    #[test]
    fn directories_named_like_the_document_are_skipped() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("inner");
        std::fs::create_dir_all(inner.join(DOCUMENT_NAME)).unwrap();

        assert_ne!(find_upward(&inner), Some(inner.join(DOCUMENT_NAME)));
    }
}
