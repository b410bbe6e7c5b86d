//! Tree-sitter structural strategy for Python sources.
//!
//! Walks the syntax tree breadth-first, collecting `class`/`def` labels and
//! import targets (relative imports keep their leading dots). A tree with
//! syntax errors is rejected so the caller falls back to pattern rules.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tree_sitter::{Node, Parser};

use crate::repomap::extract::{Extraction, ExtractionStrategy, LabelCollector};

pub struct PythonSyntaxStrategy;

impl ExtractionStrategy for PythonSyntaxStrategy {
    fn name(&self) -> &'static str {
        "python-syntax"
    }

    fn analyze(&self, text: &str) -> Option<Extraction> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .ok()?;
        let tree = parser.parse(text.as_bytes(), None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }
        let source = text.as_bytes();

        let mut labels = LabelCollector::default();
        let mut imports: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<Node> = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            match node.kind() {
                "class_definition" => {
                    if let Some(name) = field_text(node, "name", source) {
                        labels.push(format!("class {name}"));
                    }
                }
                "function_definition" => {
                    if let Some(name) = field_text(node, "name", source) {
                        labels.push(format!("def {name}"));
                    }
                }
                "import_statement" => {
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        if let Some(target) = imported_name(name, source) {
                            imports.insert(target);
                        }
                    }
                }
                "import_from_statement" => {
                    for target in from_import_targets(node, source) {
                        imports.insert(target);
                    }
                }
                "future_import_statement" => {
                    imports.insert("__future__".to_string());
                }
                _ => {}
            }
            let mut cursor = node.walk();
            queue.extend(node.named_children(&mut cursor));
        }

        let (symbols, symbol_count) = labels.finish();
        Some(Extraction {
            symbols,
            symbol_count,
            imports: imports.into_iter().collect(),
        })
    }
}

fn node_text(node: Node, source: &[u8]) -> Option<String> {
    let raw = node.utf8_text(source).ok()?;
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        None
    } else {
        Some(compact)
    }
}

fn field_text(node: Node, field: &str, source: &[u8]) -> Option<String> {
    node_text(node.child_by_field_name(field)?, source)
}

/// `a.b` or the `a.b` of `a.b as c`.
fn imported_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "aliased_import" => field_text(node, "name", source),
        _ => node_text(node, source),
    }
}

/// `from ..pkg import x` yields `..pkg`; `from . import x, y` yields `.x`
/// and `.y`.
fn from_import_targets(node: Node, source: &[u8]) -> Vec<String> {
    let Some(module) = node.child_by_field_name("module_name") else {
        return Vec::new();
    };
    let (prefix, base) = match module.kind() {
        "relative_import" => {
            let mut prefix = String::new();
            let mut base = None;
            let mut cursor = module.walk();
            for child in module.named_children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => prefix = node_text(child, source).unwrap_or_default(),
                    "dotted_name" => base = node_text(child, source),
                    _ => {}
                }
            }
            (prefix, base)
        }
        _ => (String::new(), node_text(module, source)),
    };
    if let Some(base) = base {
        return vec![format!("{prefix}{base}")];
    }

    let mut targets = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(imported) = imported_name(name, source) {
            targets.push(format!("{prefix}{imported}"));
        }
    }
    let mut cursor = node.walk();
    if node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import")
    {
        targets.push(format!("{prefix}*"));
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Extraction {
        PythonSyntaxStrategy.analyze(src).expect("valid python")
    }

    #[test]
    fn test_classes_and_functions_breadth_first() {
        let src = "\
class Service:
    def handle(self):
        pass

async def main():
    pass

def helper():
    pass
";
        let found = analyze(src);
        assert_eq!(
            found.symbols,
            vec!["class Service", "def main", "def helper", "def handle"]
        );
        assert_eq!(found.symbol_count, 4);
    }

    #[test]
    fn test_symbol_labels_capped_but_counted() {
        let src = "def a():\n    pass\ndef b():\n    pass\ndef c():\n    pass\ndef d():\n    pass\ndef e():\n    pass\n";
        let found = analyze(src);
        assert_eq!(found.symbols.len(), 4);
        assert_eq!(found.symbol_count, 5);
    }

    #[test]
    fn test_absolute_imports() {
        let found = analyze("import os\nimport pkg.sub as s, json\nfrom a.b import c\n");
        assert_eq!(found.imports, vec!["os", "pkg.sub", "json", "a.b"]);
    }

    #[test]
    fn test_relative_imports_keep_level() {
        let found = analyze("from .helpers import x\nfrom .. import models, views\n");
        assert_eq!(found.imports, vec![".helpers", "..models", "..views"]);
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        assert!(PythonSyntaxStrategy.analyze("def broken(:\n").is_none());
    }

    #[test]
    fn test_empty_module_yields_empty_extraction() {
        let found = analyze("x = 1\n");
        assert!(found.is_empty());
    }
}
