//! Filesystem helpers for image-sequence capture.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// List files under `path`, optionally filtered and depth-limited.
///
/// - `valid_exts`: keep only files whose extension matches one of these
///   (leading dot optional, case-insensitive). Empty slice keeps everything.
/// - `contains`: keep only file names containing this substring.
/// - `level`: descend at most this many directory levels below `path`
///   (`None` = unlimited, `Some(0)` = top level only).
///
/// Entries within each directory are visited in sorted order, files before
/// subdirectories, so image sequences come back in a stable order.
pub fn list_files(
    path: &Path,
    valid_exts: &[&str],
    contains: Option<&str>,
    level: Option<usize>,
) -> Result<Vec<PathBuf>> {
    let normalized_exts: Vec<String> = valid_exts
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut files = Vec::new();
    walk(path, &normalized_exts, contains, level, &mut files)?;
    Ok(files)
}

fn walk(
    dir: &Path,
    exts: &[String],
    contains: Option<&str>,
    level: Option<usize>,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("failed to read entry in {}", dir.display()))?;
    entries.sort();

    let mut subdirs = Vec::new();
    for entry in entries {
        if entry.is_dir() {
            subdirs.push(entry);
        } else if matches_filters(&entry, exts, contains) {
            out.push(entry);
        }
    }

    if level != Some(0) {
        let next_level = level.map(|l| l - 1);
        for subdir in subdirs {
            walk(&subdir, exts, contains, next_level, out)?;
        }
    }

    Ok(())
}

fn matches_filters(path: &Path, exts: &[String], contains: Option<&str>) -> bool {
    if let Some(needle) = contains {
        let matched = path
            .file_name()
            .map(|name| name.to_string_lossy().contains(needle))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if exts.is_empty() {
        return true;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            exts.iter().any(|valid| *valid == ext)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").expect("write file");
    }

    #[test]
    fn lists_sorted_and_filtered() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        touch(&root.join("b.jpg"));
        touch(&root.join("a.jpg"));
        touch(&root.join("notes.txt"));
        std::fs::create_dir(root.join("sub"))?;
        touch(&root.join("sub").join("c.png"));

        let files = list_files(root, &["jpg", "png"], None, None)?;
        assert_eq!(
            files,
            vec![
                root.join("a.jpg"),
                root.join("b.jpg"),
                root.join("sub").join("c.png")
            ]
        );
        Ok(())
    }

    #[test]
    fn level_zero_skips_subdirectories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        touch(&root.join("top.jpg"));
        std::fs::create_dir(root.join("sub"))?;
        touch(&root.join("sub").join("nested.jpg"));

        let files = list_files(root, &["jpg"], None, Some(0))?;
        assert_eq!(files, vec![root.join("top.jpg")]);
        Ok(())
    }

    #[test]
    fn contains_filter_applies_to_file_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        touch(&root.join("frame_001.jpg"));
        touch(&root.join("mask_001.jpg"));

        let files = list_files(root, &[".jpg"], Some("frame"), None)?;
        assert_eq!(files, vec![root.join("frame_001.jpg")]);
        Ok(())
    }
}
