//! Bounded filesystem walk used by repo-map scans.

use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{CortexError, CortexResult};
use crate::guards::{MAX_DISCOVER_FILE_BYTES, READ_SAMPLE_BYTES};
use crate::repomap::paths::{is_ignored, lexical_clean, rel_to_root, suffix_lower, DEFAULT_IGNORED_DIRS};

const BINARY_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".ico", ".pdf", ".zip", ".gz", ".tgz", ".bz2",
    ".xz", ".7z", ".tar", ".jar", ".war", ".so", ".dll", ".dylib", ".exe", ".bin", ".woff",
    ".woff2", ".ttf", ".otf", ".mp3", ".mp4", ".mov", ".avi", ".wav", ".sqlite", ".db", ".pyc",
    ".pyo",
];

/// Top-level directories probed, in order, when the configured scope is absent.
pub const FALLBACK_SCOPE_CANDIDATES: &[&str] = &["cortex", "src", "lib", "app", "packages", "tests"];

/// Pick the scope to scan.
///
/// A caller-supplied scope is always honoured. Otherwise the requested
/// (configured) scope is used if any entry exists, then the first existing
/// fallback candidates, then the whole root.
pub fn select_scope(root: &Path, requested: &[String], user_supplied: bool) -> Vec<String> {
    let mut normalized: Vec<String> = requested
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect();
    if normalized.is_empty() {
        normalized.push("src".to_string());
    }
    if user_supplied || normalized.iter().any(|entry| resolve_entry(root, entry).exists()) {
        return normalized;
    }
    let fallback: Vec<String> = FALLBACK_SCOPE_CANDIDATES
        .iter()
        .filter(|name| root.join(name).exists())
        .map(|name| name.to_string())
        .collect();
    if fallback.is_empty() {
        vec![".".to_string()]
    } else {
        fallback
    }
}

fn resolve_entry(root: &Path, entry: &str) -> PathBuf {
    let candidate = Path::new(entry);
    if candidate.is_absolute() {
        lexical_clean(candidate)
    } else {
        lexical_clean(&root.join(candidate))
    }
}

/// Walk every scope entry under `root` and return sorted, deduplicated
/// root-relative paths of text files.
///
/// `timed_out` is polled before each scope entry and each visited
/// directory; a `true` aborts with `CortexError::Timeout`.
pub fn discover_files(
    root: &Path,
    scope: &[String],
    ignored_dirs: &[String],
    timed_out: &dyn Fn() -> bool,
) -> CortexResult<Vec<String>> {
    if !root.is_dir() {
        return Err(CortexError::RootMissing(root.to_path_buf()));
    }
    let root = lexical_clean(root);
    let real_root = std::fs::canonicalize(&root)?;
    let ignored: HashSet<String> = DEFAULT_IGNORED_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(ignored_dirs.iter().cloned())
        .collect();

    let mut discovered: BTreeSet<String> = BTreeSet::new();
    for entry in scope {
        if timed_out() {
            return Err(CortexError::Timeout);
        }
        let target = resolve_entry(&root, entry);
        if !target.starts_with(&root) {
            debug!("Skipping scope entry outside root: {entry}");
            continue;
        }
        if !target.exists() {
            continue;
        }
        if target.is_file() {
            if let Some(rel) = rel_to_root(&target, &root) {
                if !is_ignored(&rel, &ignored) && is_text_candidate(&target, &real_root) {
                    discovered.insert(rel);
                }
            }
            continue;
        }

        let walker = WalkDir::new(&target)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                match rel_to_root(e.path(), &root) {
                    Some(rel) => !is_ignored_dir(&rel, &ignored),
                    None => false,
                }
            });
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(e) if e.depth() == 0 => return Err(CortexError::Io(e.into())),
                Err(e) => {
                    debug!("Skipping unreadable path during discovery: {e}");
                    continue;
                }
            };
            if item.file_type().is_dir() {
                if timed_out() {
                    return Err(CortexError::Timeout);
                }
                continue;
            }
            let Some(rel) = rel_to_root(item.path(), &root) else {
                continue;
            };
            if discovered.contains(&rel) || is_ignored(&rel, &ignored) {
                continue;
            }
            if is_text_candidate(item.path(), &real_root) {
                discovered.insert(rel);
            }
        }
    }
    Ok(discovered.into_iter().collect())
}

/// A directory is pruned when its own name fails the hidden-name rules or
/// when it sits under (or is) an ignored directory name.
fn is_ignored_dir(rel: &str, ignored: &HashSet<String>) -> bool {
    is_ignored(rel, ignored) || is_ignored(&format!("{rel}/_"), ignored)
}

/// Symlinks must resolve to a target inside `real_root`.
fn resolves_inside(path: &Path, real_root: &Path) -> bool {
    let is_link = std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return true;
    }
    match std::fs::canonicalize(path) {
        Ok(target) => target.starts_with(real_root),
        Err(_) => false,
    }
}

/// Regular file inside the root, within the size cap, not a binary suffix
/// and with no NUL byte in its leading sample.
fn is_text_candidate(path: &Path, real_root: &Path) -> bool {
    if !resolves_inside(path, real_root) {
        debug!("Skipping symlink resolving outside root: {}", path.display());
        return false;
    }
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() || meta.len() > MAX_DISCOVER_FILE_BYTES {
        return false;
    }
    let suffix = suffix_lower(&path.to_string_lossy());
    if BINARY_SUFFIXES.contains(&suffix.as_str()) {
        return false;
    }
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut sample = Vec::with_capacity(READ_SAMPLE_BYTES);
    if file.take(READ_SAMPLE_BYTES as u64).read_to_end(&mut sample).is_err() {
        return false;
    }
    !sample.contains(&0)
}
