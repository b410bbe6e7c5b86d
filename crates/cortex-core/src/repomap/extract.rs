//! Symbol and import extraction for repo-map file analysis.
//!
//! Two interchangeable strategies share the `ExtractionStrategy` contract.
//! `.py` files try the tree-sitter structural strategy first; it only
//! counts as a hit if it found at least one symbol or import. Everything
//! else, including structural misses, goes through the line-anchored
//! pattern strategy.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::guards::MAX_SYMBOL_LABELS;
use crate::models::FileAnalysis;
use crate::repomap::paths::suffix_lower;

/// Symbols and imports found in one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub symbols: Vec<String>,
    pub symbol_count: usize,
    pub imports: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.symbol_count == 0 && self.imports.is_empty()
    }
}

pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// Analyze decoded source text. `None` means the strategy could not
    /// handle this text at all (e.g. a parse failure).
    fn analyze(&self, text: &str) -> Option<Extraction>;
}

/// Collects distinct labels, keeping only the first `MAX_SYMBOL_LABELS`
/// but counting all of them.
#[derive(Default)]
pub(crate) struct LabelCollector {
    seen: IndexSet<String>,
}

impl LabelCollector {
    pub(crate) fn push(&mut self, label: String) {
        self.seen.insert(label);
    }

    pub(crate) fn finish(self) -> (Vec<String>, usize) {
        let count = self.seen.len();
        let labels = self.seen.into_iter().take(MAX_SYMBOL_LABELS).collect();
        (labels, count)
    }
}

// ---------------------------------------------------------------------------
// Pattern strategy
// ---------------------------------------------------------------------------

static SYMBOL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"^\s*class\s+([A-Za-z_]\w*)\b", "class"),
        (r"^\s*def\s+([A-Za-z_]\w*)\s*\(", "def"),
        (r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(", "def"),
        (r"^\s*export\s+class\s+([A-Za-z_]\w*)\b", "class"),
        (r"^\s*export\s+(?:async\s+)?function\s+([A-Za-z_]\w*)\s*\(", "function"),
        (r"^\s*(?:async\s+)?function\s+([A-Za-z_]\w*)\s*\(", "function"),
        (r"^\s*interface\s+([A-Za-z_]\w*)\b", "interface"),
        (r"^\s*type\s+([A-Za-z_]\w*)\b", "type"),
        (r"^\s*(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*(?:async\s*)?\(", "const"),
        (r"^\s*(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*function\b", "const"),
        (r"^\s*([A-Za-z_]\w*)\s*\(\)\s*\{", "function"),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
    .collect()
});

static IMPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"^\s*import\s+.*?\s+from\s+["']([^"']+)["']"#,
        r#"^\s*import\s+["']([^"']+)["']"#,
        r#"^\s*export\s+.*?\s+from\s+["']([^"']+)["']"#,
        r#"require\(\s*["']([^"']+)["']\s*\)"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Line-anchored regex rules covering Python-, C- and JS-like syntaxes.
pub struct PatternStrategy;

impl PatternStrategy {
    fn symbols(text: &str) -> (Vec<String>, usize) {
        let mut labels = LabelCollector::default();
        for line in text.lines() {
            for (pattern, kind) in SYMBOL_PATTERNS.iter() {
                if let Some(caps) = pattern.captures(line) {
                    labels.push(format!("{kind} {}", &caps[1]));
                    break;
                }
            }
        }
        labels.finish()
    }

    fn imports(text: &str) -> Vec<String> {
        let mut targets: IndexSet<String> = IndexSet::new();
        for line in text.lines() {
            for pattern in IMPORT_PATTERNS.iter() {
                let Some(caps) = pattern.captures(line) else {
                    continue;
                };
                let target = caps[1].trim();
                if !target.is_empty() {
                    targets.insert(target.to_string());
                    break;
                }
            }
        }
        targets.into_iter().collect()
    }
}

impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn analyze(&self, text: &str) -> Option<Extraction> {
        let (symbols, symbol_count) = Self::symbols(text);
        Some(Extraction {
            symbols,
            symbol_count,
            imports: Self::imports(text),
        })
    }
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

/// Run the strategies applicable to `rel_path` in order.
pub fn extract(rel_path: &str, text: &str) -> Extraction {
    if suffix_lower(rel_path) == ".py" {
        if let Some(found) = structural_extract(rel_path, text) {
            return found;
        }
    }
    PatternStrategy.analyze(text).unwrap_or_default()
}

#[cfg(feature = "python-ast")]
fn structural_extract(rel_path: &str, text: &str) -> Option<Extraction> {
    use crate::repomap::parser::PythonSyntaxStrategy;

    match PythonSyntaxStrategy.analyze(text) {
        Some(found) if !found.is_empty() => Some(found),
        Some(_) => None,
        None => {
            tracing::debug!("Structural parse failed for {rel_path}; using pattern rules");
            None
        }
    }
}

#[cfg(not(feature = "python-ast"))]
fn structural_extract(_rel_path: &str, _text: &str) -> Option<Extraction> {
    None
}

/// Count lines the way editors do: a trailing newline does not start a
/// new line.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let newlines = text.matches('\n').count();
    if text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Read and analyze one root-relative file. Read or decode problems
/// degrade to an analysis with zero symbols and imports.
pub fn analyze_file(root: &Path, rel_path: &str) -> FileAnalysis {
    let path = root.join(rel_path);
    let byte_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let text = match std::fs::read(&path) {
        Ok(bytes) => decode_lossy(&bytes),
        Err(e) => {
            tracing::debug!("Failed to read {rel_path}: {e}");
            String::new()
        }
    };
    let mut analysis = FileAnalysis {
        byte_size,
        ..FileAnalysis::empty(rel_path)
    };
    if text.is_empty() {
        return analysis;
    }
    let found = extract(rel_path, &text);
    analysis.line_count = count_lines(&text);
    analysis.symbols = found.symbols;
    analysis.symbol_count = found.symbol_count;
    analysis.imports = found.imports;
    analysis
}

pub fn analyze_files(root: &Path, files: &[String]) -> Vec<FileAnalysis> {
    files.iter().map(|rel| analyze_file(root, rel)).collect()
}

/// UTF-8 decode that drops invalid sequences instead of replacing them.
fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
