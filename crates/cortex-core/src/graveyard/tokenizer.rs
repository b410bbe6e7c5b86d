//! Tokenization and light normalization of failure text.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_./-]+").unwrap());

const BOUNDARY_CHARS: &[char] = &['.', '_', '/', '-'];

const SYNONYMS: &[(&str, &str)] = &[
    ("redis", "cache"),
    ("caching", "cache"),
    ("latency", "timeout"),
    ("slow", "timeout"),
    ("slowness", "timeout"),
    ("crash", "fail"),
    ("crashed", "fail"),
    ("failure", "fail"),
    ("failed", "fail"),
    ("error", "fail"),
    ("errors", "fail"),
    ("exception", "fail"),
    ("exceptions", "fail"),
    ("connection", "connect"),
    ("connections", "connect"),
];

fn canonical(word: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == word)
        .map(|(_, to)| *to)
}

fn stem(word: &str) -> String {
    let len = word.len();
    if let Some(base) = word.strip_suffix("ies").filter(|_| len > 4) {
        format!("{base}y")
    } else if let Some(base) = word.strip_suffix("ing").filter(|_| len > 5) {
        base.to_string()
    } else if let Some(base) = word.strip_suffix("ed").filter(|_| len > 4) {
        base.to_string()
    } else if let Some(base) = word.strip_suffix('s').filter(|_| len > 3) {
        base.to_string()
    } else {
        word.to_string()
    }
}

/// Normalize one raw word. Returns `None` for words of two characters or
/// fewer after boundary punctuation is stripped.
///
/// The synonym table is consulted on the surface form first, so entries
/// such as `redis` or `caching` are not mangled by the suffix rules, and
/// again after stemming.
pub fn normalize_token(raw: &str) -> Option<String> {
    let lowered = raw.to_ascii_lowercase();
    let value = lowered.trim_matches(BOUNDARY_CHARS);
    if value.len() <= 2 {
        return None;
    }
    if let Some(mapped) = canonical(value) {
        return Some(mapped.to_string());
    }
    let stemmed = stem(value);
    match canonical(&stemmed) {
        Some(mapped) => Some(mapped.to_string()),
        None => Some(stemmed),
    }
}

/// Normalized tokens in text order, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .filter_map(|m| normalize_token(m.as_str()))
        .collect()
}

pub fn keywords(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

/// Drop empty and `.` segments so `./src//a.py` and `src/a.py` compare equal.
pub fn norm_path(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
