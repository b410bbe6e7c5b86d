//! Root-relative POSIX path helpers and ignore rules for repo-map scans.

use std::collections::HashSet;
use std::path::{Component, Path};

pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".cortex",
    "node_modules",
    "dist",
    "build",
    "__pycache__",
    ".next",
    "coverage",
];

const HIDDEN_FILE_ALLOWLIST: &[&str] = &[".env", ".gitignore"];

const DENIED_NAME_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".map"];

/// Collapse `.`/`..`/empty segments of a `/`-separated path.
///
/// Returns `None` when `..` climbs above the start of the path or nothing
/// is left.
pub fn normalize_rel(path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    let normalized = path.replace('\\', "/");
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            _ => stack.push(part),
        }
    }
    if stack.is_empty() {
        None
    } else {
        Some(stack.join("/"))
    }
}

/// Lexically express `path` relative to `root` as a POSIX string.
///
/// Both inputs are expected to be absolute and free of symlink games;
/// `..` segments are resolved lexically. Returns `None` for paths outside
/// `root` or equal to it.
pub fn rel_to_root(path: &Path, root: &Path) -> Option<String> {
    let lexical = lexical_clean(path);
    let root = lexical_clean(root);
    let rel = lexical.strip_prefix(&root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_clean(path: &Path) -> std::path::PathBuf {
    let mut out = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Apply the directory-name, hidden-file and minified-suffix rules to a
/// root-relative path.
pub fn is_ignored(rel_path: &str, ignored_dirs: &HashSet<String>) -> bool {
    let parts: Vec<&str> = rel_path.split('/').filter(|p| !p.is_empty()).collect();
    let Some((filename, dirs)) = parts.split_last() else {
        return true;
    };
    if dirs.iter().any(|d| ignored_dirs.contains(*d)) {
        return true;
    }
    if filename.starts_with('.') && !HIDDEN_FILE_ALLOWLIST.contains(filename) {
        return true;
    }
    DENIED_NAME_SUFFIXES.iter().any(|s| filename.ends_with(s))
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lower-cased final suffix including the dot (`".py"`), or `""`.
pub fn suffix_lower(path: &str) -> String {
    Path::new(file_name(path))
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// File name with its final suffix removed.
pub fn stem(path: &str) -> String {
    Path::new(file_name(path))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory part of a relative POSIX path (`""` for top-level files).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
