//! Built-in tools that come with the agent.

mod echo;
mod file_create;
mod file_search;

use std::fs::FileType;
use std::path::{Path, PathBuf};

pub use echo::EchoTool;
pub use file_create::BatchFileCreateTool;
pub use file_search::BatchFileSearchTool;

/// Parse a comma-separated extension filter (".txt, .MD") into lowercase
/// extensions. An empty result means "all files".
pub(crate) fn allowed_extensions(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Collect files below `root` (depth-first, sorted per directory) whose
/// extension passes `exts`. Unreadable directories are skipped and symlinked
/// directories are not descended into; symlinked files are collected.
pub(crate) fn walk_files(root: &Path, exts: &[String], out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    let mut entries: Vec<(PathBuf, FileType)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| Some((e.path(), e.file_type().ok()?)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in entries {
        if file_type.is_dir() {
            walk_files(&path, exts, out);
        } else if file_type.is_symlink() && path.is_dir() {
            continue;
        } else if extension_allowed(&path, exts) {
            out.push(path);
        }
    }
}

fn extension_allowed(path: &Path, exts: &[String]) -> bool {
    if exts.is_empty() {
        return true;
    }
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    exts.contains(&ext)
}

/// Read a file as UTF-8, falling back to Latin-1 for non-UTF-8 content.
pub(crate) fn read_text_lossy(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    match String::from_utf8(bytes) {
        Ok(s) => Some(s),
        Err(e) => Some(e.into_bytes().iter().map(|&b| b as char).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        assert_eq!(allowed_extensions(".txt, .MD,,"), vec![".txt", ".md"]);
        assert!(allowed_extensions("").is_empty());
    }

    #[test]
    fn test_extension_allowed() {
        let exts = allowed_extensions(".txt");
        assert!(extension_allowed(Path::new("a/B.TXT"), &exts));
        assert!(!extension_allowed(Path::new("a/b.md"), &exts));
        assert!(!extension_allowed(Path::new("a/README"), &exts));
        assert!(extension_allowed(Path::new("a/README"), &[]));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_files_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "TODO").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "TODO").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("sub/up")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let mut files = Vec::new();
        walk_files(dir.path(), &[], &mut files);
        assert_eq!(
            files,
            vec![
                dir.path().join("a.txt"),
                dir.path().join("alias.txt"),
                dir.path().join("sub/b.txt"),
            ]
        );
    }

    #[test]
    fn test_read_text_lossy_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
        assert_eq!(read_text_lossy(&path).unwrap(), "café");
    }
}
