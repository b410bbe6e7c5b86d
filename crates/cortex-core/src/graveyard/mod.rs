//! Failure graveyard: record failed attempts and retrieve similar past
//! failures for a new one.

pub mod similarity;
pub mod tokenizer;

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::GraveyardConfig;
use crate::errors::CortexResult;
use crate::guards::{clamp_min, clamp_window};
use crate::models::{FailureRecord, MatchResult, NewFailure};
use crate::store::{FailureStore, Narrowing};

use self::similarity::{idf_weights, rank_matches, FailureQuery, ScoringParams};
use self::tokenizer::{keywords, tokenize};

pub struct Graveyard<S: FailureStore> {
    store: S,
    config: GraveyardConfig,
}

impl<S: FailureStore> Graveyard<S> {
    pub fn new(store: S, config: GraveyardConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GraveyardConfig {
        &self.config
    }

    /// Append a failure with keywords drawn from its summary and reason.
    /// Returns `None` when the graveyard is disabled.
    pub fn record_failure(
        &self,
        session_id: Option<&str>,
        summary: &str,
        reason: &str,
        files: &[String],
    ) -> CortexResult<Option<FailureRecord>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let merged: BTreeSet<String> = keywords(summary).into_iter().chain(keywords(reason)).collect();
        let record = self.store.append_failure(NewFailure {
            session_id: session_id.map(str::to_string),
            summary: summary.to_string(),
            reason: reason.to_string(),
            files: files.to_vec(),
            keywords: merged.into_iter().collect(),
        })?;
        debug!("Recorded failure {} with {} keywords", record.id, record.keywords.len());
        Ok(Some(record))
    }

    /// Past failures similar to `summary` and `files`, best first.
    /// `max_matches` of `None` or zero uses the configured limit.
    pub fn find_similar(
        &self,
        summary: &str,
        files: &[String],
        max_matches: Option<usize>,
    ) -> Vec<MatchResult> {
        if !self.config.enabled {
            return Vec::new();
        }
        let query = FailureQuery::new(summary, files);
        if query.is_empty() {
            return Vec::new();
        }

        let window_size = clamp_window(self.config.window);
        let window = match self.store.recent_failures(window_size) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read failure window: {e}");
                return Vec::new();
            }
        };
        let tokens = tokenize(summary);
        let narrowed = self.narrowed_candidates(&tokens, window_size);
        let candidates: &[FailureRecord] = narrowed.as_deref().unwrap_or(&window[..]);
        let idf_source = if window.is_empty() { candidates } else { &window[..] };
        let idf = idf_weights(&query.keywords, idf_source);

        let params = ScoringParams {
            similarity_threshold: self.config.similarity_threshold,
            min_keyword_overlap: self.config.min_keyword_overlap,
        };
        let limit = match max_matches {
            Some(n) if n > 0 => n,
            _ => clamp_min(self.config.max_matches, 1),
        };
        rank_matches(&query, candidates, &idf, params, limit)
    }

    /// Indexed shortlist, or `None` when the full window should be scanned.
    fn narrowed_candidates(&self, tokens: &[String], window: usize) -> Option<Vec<FailureRecord>> {
        if tokens.is_empty() {
            return None;
        }
        let limit = clamp_min(self.config.candidate_limit, 1);
        match self.store.narrow_candidates(tokens, window, limit) {
            Ok(Narrowing::Candidates(found)) if !found.is_empty() => Some(found),
            Ok(_) => None,
            Err(e) => {
                debug!("Candidate narrowing failed, scanning full window: {e}");
                None
            }
        }
    }
}
