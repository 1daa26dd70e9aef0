//! Deterministic directory traversal.
//!
//! Entries are visited in file-name order so that "first match wins"
//! lookups give the same answer on every filesystem.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// File names whose presence marks a directory as deployable infrastructure.
pub const INFRA_MANIFESTS: &[&str] = &["azure.yaml", "azure.yml"];

/// Sorted, error-tolerant walk rooted at `root` (root included).
pub fn sorted_walk(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
}

/// Every directory under `root`, `root` first.
pub fn all_dirs(root: &Path) -> Vec<PathBuf> {
    sorted_walk(root)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

/// Directories that contain an infrastructure manifest, in walk order.
pub fn find_infra_paths(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in sorted_walk(root).filter(|e| e.file_type().is_file()) {
        let name = entry.file_name().to_string_lossy();
        if !INFRA_MANIFESTS.iter().any(|m| name.eq_ignore_ascii_case(m)) {
            continue;
        }
        if let Some(parent) = entry.path().parent() {
            let parent = parent.to_path_buf();
            if !found.contains(&parent) {
                found.push(parent);
            }
        }
    }
    debug!(root = %root.display(), count = found.len(), "infra manifest locations");
    found
}

/// `path` relative to `root` as a `/`-joined key; `""` for `root` itself.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    normalize_key(&rel.to_string_lossy())
}

/// Normalize a user-supplied relative path: `"."`, `"./"` and `""` all mean
/// the root; separators become `/`; `.` components and trailing slashes vanish.
pub fn normalize_key(raw: &str) -> String {
    Path::new(&raw.replace('\\', "/"))
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
