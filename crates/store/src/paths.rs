//! Absolute ↔ workspace-relative path conversion.
//!
//! Stored paths are workspace-relative whenever the file lies under the
//! workspace root, which keeps the favorites file portable across
//! checkouts that share the same layout. Paths outside the root are
//! stored absolute. Both conversions are total: on any input they
//! cannot handle they fall back to returning the input unchanged.

use std::path::{Component, Path, PathBuf};

/// Converts an absolute path to a workspace-relative one when the path
/// lies under `workspace_root`; otherwise returns the input unchanged.
/// 若路徑位於工作區根目錄下則轉為相對路徑，否則原樣回傳。
pub fn to_relative(absolute: &Path, workspace_root: &Path) -> PathBuf {
    let full = normalize_lexically(absolute);
    let root = normalize_lexically(workspace_root);

    let full_components: Vec<Component<'_>> = full.components().collect();
    let root_components: Vec<Component<'_>> = root.components().collect();
    if root_components.is_empty() || full_components.len() <= root_components.len() {
        return absolute.to_path_buf();
    }
    for (candidate, base) in full_components.iter().zip(&root_components) {
        if !component_matches(candidate, base) {
            return absolute.to_path_buf();
        }
    }

    full_components[root_components.len()..].iter().collect()
}

/// Resolves a stored path against the workspace root. Already-absolute
/// input is returned unchanged.
/// 將儲存的路徑還原為絕對路徑；若輸入已是絕對路徑則原樣回傳。
pub fn to_absolute(stored: &Path, workspace_root: &Path) -> PathBuf {
    if stored.is_absolute() {
        return stored.to_path_buf();
    }
    normalize_lexically(&workspace_root.join(stored))
}

/// Removes `.` components and resolves `..` lexically, without touching
/// the filesystem.
/// 純字面方式移除 `.` 並解析 `..`，不存取檔案系統。
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn component_matches(candidate: &Component<'_>, base: &Component<'_>) -> bool {
    if candidate == base {
        return true;
    }
    // Case-insensitive containment only where the filesystem is.
    if cfg!(windows) {
        let candidate = candidate.as_os_str().to_string_lossy();
        let base = base.as_os_str().to_string_lossy();
        candidate.eq_ignore_ascii_case(&base)
    } else {
        false
    }
}
