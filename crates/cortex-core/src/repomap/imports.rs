//! Import resolution from raw import targets to file→file dependency edges.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::FileAnalysis;
use crate::repomap::paths::{file_name, normalize_rel, parent_dir, suffix_lower};

/// Extensions probed, in order, for extensionless path-like imports.
const RELATIVE_IMPORT_SUFFIX_CANDIDATES: &[&str] = &[
    ".py", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".astro", ".vue", ".svelte",
];

/// Directed edge `(importer, imported)` between two discovered files.
pub type DependencyEdge = (String, String);

/// Dotted module name → file. `pkg/__init__.py` maps to `pkg`.
pub fn build_python_module_index(paths: &BTreeSet<String>) -> BTreeMap<String, String> {
    let mut index = BTreeMap::new();
    for rel in paths {
        if suffix_lower(rel) != ".py" {
            continue;
        }
        let module_name = if file_name(rel) == "__init__.py" {
            parent_dir(rel).replace('/', ".")
        } else {
            rel[..rel.len() - 3].replace('/', ".")
        };
        if !module_name.is_empty() {
            index.entry(module_name).or_insert_with(|| rel.clone());
        }
    }
    index
}

/// Resolve an absolute (`a.b`) or relative (`..a.b`) Python import.
pub fn resolve_python_import(
    source_path: &str,
    target: &str,
    index: &BTreeMap<String, String>,
) -> Option<String> {
    if target.is_empty() {
        return None;
    }
    if !target.starts_with('.') {
        return index.get(target).cloned();
    }

    let level = target.chars().take_while(|&c| c == '.').count();
    let tail = &target[level..];
    let package_dir = parent_dir(source_path);
    let mut base_parts: Vec<&str> = package_dir.split('/').filter(|p| !p.is_empty()).collect();
    let trim = level - 1;
    if trim > base_parts.len() {
        return None;
    }
    base_parts.truncate(base_parts.len() - trim);
    let tail_parts = tail.split('.').filter(|p| !p.is_empty());
    let module_parts: Vec<&str> = base_parts.into_iter().chain(tail_parts).collect();
    if module_parts.is_empty() {
        return None;
    }
    index.get(&module_parts.join(".")).cloned()
}

/// Resolve a path-like target (`./x`, `../x`, `/x`) relative to the
/// importing file's directory, probing extension and `index.<ext>`
/// candidates when the literal path has no suffix.
pub fn resolve_relative_import(
    source_path: &str,
    target: &str,
    available: &BTreeSet<String>,
) -> Option<String> {
    let raw = if target.starts_with('.') {
        match parent_dir(source_path) {
            "" => target.to_string(),
            dir => format!("{dir}/{target}"),
        }
    } else if let Some(stripped) = target.strip_prefix('/') {
        stripped.trim_start_matches('/').to_string()
    } else {
        return None;
    };
    let base = normalize_rel(&raw)?;
    if available.contains(&base) {
        return Some(base);
    }
    if !suffix_lower(&base).is_empty() {
        return None;
    }
    RELATIVE_IMPORT_SUFFIX_CANDIDATES
        .iter()
        .flat_map(|ext| [format!("{base}{ext}"), format!("{base}/index{ext}")])
        .find(|candidate| available.contains(candidate))
}

/// Build sorted, deduplicated dependency edges between analyzed files.
pub fn build_dependency_edges(analyses: &[FileAnalysis]) -> Vec<DependencyEdge> {
    let available: BTreeSet<String> = analyses.iter().map(|a| a.path.clone()).collect();
    let python_index = build_python_module_index(&available);
    let mut edges: HashSet<DependencyEdge> = HashSet::new();

    for analysis in analyses {
        let src = analysis.path.as_str();
        let is_python = suffix_lower(src) == ".py";
        for raw_target in &analysis.imports {
            let target = raw_target
                .split('?')
                .next()
                .unwrap_or_default()
                .split('#')
                .next()
                .unwrap_or_default()
                .trim();
            if target.is_empty() {
                continue;
            }
            let mut resolved = None;
            if is_python {
                resolved = resolve_python_import(src, target, &python_index);
            }
            if resolved.is_none() {
                resolved = resolve_relative_import(src, target, &available);
            }
            if let Some(dst) = resolved {
                if dst != src && available.contains(&dst) {
                    edges.insert((src.to_string(), dst));
                }
            }
        }
    }

    let mut sorted: Vec<DependencyEdge> = edges.into_iter().collect();
    sorted.sort();
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(path: &str, imports: &[&str]) -> FileAnalysis {
        FileAnalysis {
            imports: imports.iter().map(|s| s.to_string()).collect(),
            ..FileAnalysis::empty(path)
        }
    }

    fn paths(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_module_index_maps_packages() {
        let index = build_python_module_index(&paths(&["pkg/__init__.py", "pkg/mod.py", "top.py", "x.ts"]));
        assert_eq!(index.get("pkg").map(String::as_str), Some("pkg/__init__.py"));
        assert_eq!(index.get("pkg.mod").map(String::as_str), Some("pkg/mod.py"));
        assert_eq!(index.get("top").map(String::as_str), Some("top.py"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_python_relative_import_edge() {
        let edges = build_dependency_edges(&[
            analysis("src/pkg/module.py", &[".helpers"]),
            analysis("src/pkg/helpers.py", &[]),
        ]);
        assert_eq!(
            edges,
            vec![("src/pkg/module.py".to_string(), "src/pkg/helpers.py".to_string())]
        );
    }

    #[test]
    fn test_python_parent_relative_and_absolute() {
        let index = build_python_module_index(&paths(&[
            "app/core/db.py",
            "app/api/views.py",
            "app/__init__.py",
        ]));
        assert_eq!(
            resolve_python_import("app/api/views.py", "..core.db", &index).as_deref(),
            Some("app/core/db.py")
        );
        assert_eq!(
            resolve_python_import("app/api/views.py", "app.core.db", &index).as_deref(),
            Some("app/core/db.py")
        );
        assert_eq!(
            resolve_python_import("app/api/views.py", "..", &index).as_deref(),
            Some("app/__init__.py")
        );
        assert_eq!(resolve_python_import("top.py", "...x", &index), None);
    }

    #[test]
    fn test_relative_path_probes_extensions_and_index() {
        let available = paths(&["src/util.ts", "src/widgets/index.tsx", "src/app.ts"]);
        assert_eq!(
            resolve_relative_import("src/app.ts", "./util", &available).as_deref(),
            Some("src/util.ts")
        );
        assert_eq!(
            resolve_relative_import("src/app.ts", "./widgets", &available).as_deref(),
            Some("src/widgets/index.tsx")
        );
        assert_eq!(
            resolve_relative_import("src/app.ts", "/src/util.ts", &available).as_deref(),
            Some("src/util.ts")
        );
        assert_eq!(resolve_relative_import("src/app.ts", "react", &available), None);
        assert_eq!(resolve_relative_import("src/app.ts", "./util.js", &available), None);
        assert_eq!(resolve_relative_import("app.ts", "../up", &available), None);
    }

    #[test]
    fn test_edges_strip_query_dedupe_and_skip_self() {
        let edges = build_dependency_edges(&[
            analysis("src/main.ts", &["./util?raw", "./util#frag", "./main", "./missing"]),
            analysis("src/util.ts", &[]),
        ]);
        assert_eq!(edges, vec![("src/main.ts".to_string(), "src/util.ts".to_string())]);
    }

    #[test]
    fn test_python_falls_back_to_path_resolution() {
        let edges = build_dependency_edges(&[
            analysis("tools/run.py", &["./helper"]),
            analysis("tools/helper.py", &[]),
        ]);
        assert_eq!(edges.len(), 1);
    }
}
