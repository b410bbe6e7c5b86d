//! Scoring of failure records against a query.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graveyard::tokenizer::{norm_path, tokenize};
use crate::models::{FailureRecord, MatchResult};

const KEYWORD_WEIGHT: f64 = 0.45;
const FILE_WEIGHT: f64 = 0.25;
const SEMANTIC_WEIGHT: f64 = 0.30;

/// Pre-tokenized query.
#[derive(Clone, Debug, Default)]
pub struct FailureQuery {
    pub keywords: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

impl FailureQuery {
    pub fn new<S: AsRef<str>>(summary: &str, files: &[S]) -> Self {
        Self {
            keywords: tokenize(summary).into_iter().collect(),
            files: files
                .iter()
                .map(|f| f.as_ref())
                .filter(|f| !f.is_empty())
                .map(norm_path)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.files.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScoringParams {
    pub similarity_threshold: f64,
    pub min_keyword_overlap: usize,
}

/// `ln((N + 1) / (df + 1)) + 1` for every query keyword, with document
/// frequency counted over each record's keyword set.
pub fn idf_weights(keywords: &BTreeSet<String>, corpus: &[FailureRecord]) -> BTreeMap<String, f64> {
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for record in corpus {
        let unique: BTreeSet<&str> = record.keywords.iter().map(String::as_str).collect();
        for keyword in unique {
            *doc_freq.entry(keyword).or_default() += 1;
        }
    }
    let size = corpus.len() as f64;
    keywords
        .iter()
        .map(|k| {
            let df = doc_freq.get(k.as_str()).copied().unwrap_or(0) as f64;
            (k.clone(), ((size + 1.0) / (df + 1.0)).ln() + 1.0)
        })
        .collect()
}

pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Score one record, or `None` when it fails the relevance gate or the
/// final threshold.
pub fn score_record(
    query: &FailureQuery,
    record: &FailureRecord,
    idf: &BTreeMap<String, f64>,
    params: ScoringParams,
) -> Option<MatchResult> {
    let record_keywords: BTreeSet<String> = record.keywords.iter().cloned().collect();
    let record_tokens: BTreeSet<String> =
        tokenize(&format!("{} {}", record.summary, record.reason)).into_iter().collect();
    let record_files: BTreeSet<String> = record.files.iter().map(|f| norm_path(f)).collect();

    let keyword_overlap: Vec<String> = query.keywords.intersection(&record_keywords).cloned().collect();
    let file_overlap: Vec<String> = query.files.intersection(&record_files).cloned().collect();
    let semantic_score = jaccard(&query.keywords, &record_tokens);

    if keyword_overlap.len() < params.min_keyword_overlap
        && file_overlap.is_empty()
        && semantic_score < params.similarity_threshold
    {
        return None;
    }

    let total_weight: f64 = idf.values().sum();
    let total_weight = if total_weight > 0.0 { total_weight } else { 1.0 };
    let keyword_score: f64 = keyword_overlap
        .iter()
        .map(|k| idf.get(k).copied().unwrap_or(0.0))
        .sum::<f64>()
        / total_weight;
    let file_score = if query.files.is_empty() {
        0.0
    } else {
        file_overlap.len() as f64 / query.files.len() as f64
    };
    let score =
        KEYWORD_WEIGHT * keyword_score + FILE_WEIGHT * file_score + SEMANTIC_WEIGHT * semantic_score;
    if score < params.similarity_threshold {
        return None;
    }

    Some(MatchResult {
        entry_id: record.id,
        score,
        summary: record.summary.clone(),
        reason: record.reason.clone(),
        files: record.files.clone(),
        keyword_overlap,
        file_overlap,
        semantic_score,
        created_at: record.created_at.clone(),
    })
}

/// Score every candidate, keep the survivors, order by score then id
/// (both descending) and truncate to `max_matches`.
pub fn rank_matches(
    query: &FailureQuery,
    candidates: &[FailureRecord],
    idf: &BTreeMap<String, f64>,
    params: ScoringParams,
    max_matches: usize,
) -> Vec<MatchResult> {
    let mut matches: Vec<MatchResult> = candidates
        .iter()
        .filter_map(|record| score_record(query, record, idf, params))
        .collect();
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.entry_id.cmp(&a.entry_id))
    });
    matches.truncate(max_matches);
    matches
}
