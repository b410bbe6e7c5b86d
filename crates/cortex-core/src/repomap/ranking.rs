//! Heuristic file scoring combining static signals with graph importance.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::models::{FileAnalysis, RankingEntry};
use crate::repomap::paths::{file_name, stem, suffix_lower};

const CODE_LIKE_SUFFIXES: &[&str] = &[
    ".astro", ".svelte", ".vue", ".py", ".pyi", ".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs",
    ".java", ".kt", ".go", ".rs", ".rb", ".php", ".c", ".cc", ".cpp", ".h", ".hpp", ".cs",
    ".swift", ".scala", ".lua", ".sh", ".bash", ".zsh", ".ps1", ".toml", ".yaml", ".yml",
    ".json", ".sql", ".md", ".html", ".css", ".scss",
];

const SUFFIX_BOOSTS: &[(&str, f64)] = &[(".astro", 0.9), (".tsx", 0.5), (".jsx", 0.4)];

const NAME_BOOSTS: &[(&str, f64)] = &[
    ("core", 0.9),
    ("main", 0.8),
    ("app", 0.7),
    ("index", 0.6),
    ("server", 0.7),
    ("client", 0.5),
    ("api", 0.6),
    ("router", 0.5),
    ("service", 0.4),
    ("model", 0.3),
    ("store", 0.3),
];

const PATH_PENALTIES: &[(&str, f64)] = &[
    ("tests", 0.85),
    ("test", 0.85),
    ("docs", 0.65),
    ("examples", 0.7),
    ("scripts", 0.8),
    ("migrations", 0.8),
];

const PATH_BOOSTS: &[(&str, f64)] = &[
    ("src", 0.15),
    ("components", 0.2),
    ("pages", 0.2),
    ("layouts", 0.15),
];

const EXACT_FILENAME_PENALTIES: &[(&str, f64)] = &[
    ("package-lock.json", 1.8),
    ("pnpm-lock.yaml", 1.8),
    ("yarn.lock", 1.8),
    ("poetry.lock", 1.4),
    ("cargo.lock", 1.4),
    ("composer.lock", 1.2),
];

const CODE_FILE_BONUS: f64 = 1.6;
const FOCUS_EXACT_BONUS: f64 = 25.0;
const FOCUS_BASENAME_BONUS: f64 = 4.0;
const GENERATED_PENALTY: f64 = 0.4;
const GRAPH_WEIGHT: f64 = 2.0;

fn lookup(table: &[(&str, f64)], key: &str) -> f64 {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .unwrap_or(0.0)
}

/// Static score for one file. `graph_score` is the max-normalized
/// PageRank value, if graph mode ran.
pub fn score_file(
    analysis: &FileAnalysis,
    focus: &HashSet<String>,
    focus_basenames: &HashSet<String>,
    graph_score: Option<f64>,
) -> f64 {
    let path = analysis.path.replace('\\', "/");
    let suffix = suffix_lower(&path);
    let name = file_name(&path);
    let depth = path.matches('/').count();

    let mut score = 1.0;
    if CODE_LIKE_SUFFIXES.contains(&suffix.as_str()) {
        score += CODE_FILE_BONUS;
    }
    score += lookup(SUFFIX_BOOSTS, &suffix);

    if focus.contains(&path) {
        score += FOCUS_EXACT_BONUS;
    } else if focus_basenames.contains(name) {
        score += FOCUS_BASENAME_BONUS;
    }

    score += (0.8 - depth.min(10) as f64 * 0.08).max(0.0);
    score += (analysis.symbol_count as f64 * 0.2).min(1.5);
    score += (analysis.line_count as f64 / 400.0).min(0.8);

    let stem = stem(&path).to_lowercase();
    for (boost_name, boost) in NAME_BOOSTS {
        if stem == *boost_name
            || stem.starts_with(&format!("{boost_name}_"))
            || stem.ends_with(&format!("_{boost_name}"))
        {
            score += boost;
        }
    }

    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        let lowered = segment.to_lowercase();
        score += lookup(PATH_BOOSTS, &lowered);
        score -= lookup(PATH_PENALTIES, &lowered);
    }

    score -= lookup(EXACT_FILENAME_PENALTIES, &name.to_lowercase());
    if stem.contains("generated") || stem.contains("snapshot") {
        score -= GENERATED_PENALTY;
    }
    if let Some(graph) = graph_score {
        score += GRAPH_WEIGHT * graph.max(0.0);
    }
    score.max(0.0)
}

/// Score, order (score desc, path asc) and truncate to `max_files`.
pub fn rank_files(
    analyses: &[FileAnalysis],
    focus_files: &[String],
    max_files: usize,
    graph_scores: &BTreeMap<String, f64>,
) -> Vec<RankingEntry> {
    let focus: HashSet<String> = focus_files.iter().map(|f| f.replace('\\', "/")).collect();
    let focus_basenames: HashSet<String> = focus.iter().map(|f| file_name(f).to_string()).collect();

    let mut scored: Vec<RankingEntry> = analyses
        .iter()
        .map(|analysis| {
            let path = analysis.path.replace('\\', "/");
            let graph = graph_scores.get(&path).copied();
            RankingEntry {
                score: score_file(analysis, &focus, &focus_basenames, graph),
                path,
                symbols: analysis.symbols.clone(),
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    scored.truncate(max_files);
    scored
}
