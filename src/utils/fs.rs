//! Filesystem helpers shared by the pipelines.

use anyhow::{Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Collect all files from a directory recursively, sorted by path.
///
/// A missing directory yields an empty list.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Collect files under `dir` with the given extension (no dot).
pub fn collect_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    collect_all_files(dir)
        .into_iter()
        .filter(|p| has_extension(p, extension))
        .collect()
}

#[inline]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Check if destination is at least as new as its source.
pub fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    let Ok(src_time) = src.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    let Ok(dst_time) = dst.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    src_time <= dst_time
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Format `path` relative to `root` for log display.
pub fn rel_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Wait for a file to stop growing (editors and image tools write in chunks).
pub fn wait_until_stable(path: &Path, max_retries: usize) -> Result<()> {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    let mut last_size = fs::metadata(path)?.len();

    for _ in 0..max_retries {
        thread::sleep(POLL_INTERVAL);
        let current_size = fs::metadata(path)?.len();
        if current_size == last_size {
            return Ok(());
        }
        last_size = current_size;
    }

    bail!("File did not stabilize after {max_retries} retries")
}
