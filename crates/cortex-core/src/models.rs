//! Shared typed models for the repo-map and graveyard engines.

use serde::{Deserialize, Serialize, Serializer};

/// Artifact schema identifier written into every repo-map artifact.
pub const REPOMAP_SCHEMA_VERSION: &str = "repomap_artifact_v1";

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn serialize_6dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 6))
}

fn serialize_3dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 3))
}

// ---------------------------------------------------------------------------
// Repo-map
// ---------------------------------------------------------------------------

/// Per-file extraction result. Built fresh for every scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileAnalysis {
    pub path: String,
    pub byte_size: u64,
    pub line_count: usize,
    /// At most `MAX_SYMBOL_LABELS` labels such as `class Foo`.
    pub symbols: Vec<String>,
    pub symbol_count: usize,
    /// Raw, unresolved import targets in first-seen order.
    pub imports: Vec<String>,
}

impl FileAnalysis {
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub path: String,
    #[serde(serialize_with = "serialize_6dp")]
    pub score: f64,
    pub symbols: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoMapMethod {
    AstPagerank,
    HeuristicFallback,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerankBackend {
    Petgraph,
    Simple,
    None,
}

impl PagerankBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagerankBackend::Petgraph => "petgraph",
            PagerankBackend::Simple => "simple",
            PagerankBackend::None => "none",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub method: RepoMapMethod,
    pub source_root: String,
    pub scope: Vec<String>,
    pub focus_files: Vec<String>,
    pub duration_ms: u64,
    pub timeout_ms: Option<i64>,
    pub ast_requested: bool,
    pub ast_enabled: bool,
    pub missing_deps: Vec<String>,
    pub pagerank_backend: PagerankBackend,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMapStats {
    pub files_parsed: usize,
    pub symbols_found: usize,
    pub graph_edges: usize,
    pub byte_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ScanFailed,
    Timeout,
    WriteFailed,
    DepsMissing,
}

impl ErrorCode {
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ScanFailed | ErrorCode::Timeout | ErrorCode::WriteFailed | ErrorCode::DepsMissing
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Discovery,
    Write,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    pub failed_stage: FailedStage,
}

impl ArtifactError {
    pub fn new(code: ErrorCode, message: impl Into<String>, failed_stage: FailedStage) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.retryable(),
            failed_stage,
        }
    }
}

/// One repo-map run, as persisted. `ok == false` artifacts carry empty
/// stats, ranking and text plus a populated `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoMapArtifact {
    pub schema_version: String,
    pub ok: bool,
    pub generated_at: String,
    pub provenance: Provenance,
    pub stats: RepoMapStats,
    pub ranking: Vec<RankingEntry>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ArtifactError>,
}

impl RepoMapArtifact {
    /// Pretty JSON with object keys in sorted order.
    pub fn to_sorted_json(&self) -> serde_json::Result<String> {
        let value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }
}

// ---------------------------------------------------------------------------
// Graveyard
// ---------------------------------------------------------------------------

/// Input for appending a failure record to a store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewFailure {
    pub session_id: Option<String>,
    pub summary: String,
    pub reason: String,
    pub files: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: i64,
    pub session_id: Option<String>,
    pub summary: String,
    pub reason: String,
    pub files: Vec<String>,
    pub keywords: Vec<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub entry_id: i64,
    #[serde(serialize_with = "serialize_3dp")]
    pub score: f64,
    pub summary: String,
    pub reason: String,
    pub files: Vec<String>,
    pub keyword_overlap: Vec<String>,
    pub file_overlap: Vec<String>,
    #[serde(serialize_with = "serialize_3dp")]
    pub semantic_score: f64,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_artifact() -> RepoMapArtifact {
        RepoMapArtifact {
            schema_version: REPOMAP_SCHEMA_VERSION.to_string(),
            ok: false,
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            provenance: Provenance {
                method: RepoMapMethod::None,
                source_root: "/repo".to_string(),
                scope: vec!["src".to_string()],
                focus_files: vec![],
                duration_ms: 0,
                timeout_ms: Some(0),
                ast_requested: true,
                ast_enabled: true,
                missing_deps: vec![],
                pagerank_backend: PagerankBackend::None,
            },
            stats: RepoMapStats::default(),
            ranking: vec![],
            text: String::new(),
            error: Some(ArtifactError::new(
                ErrorCode::Timeout,
                "timed out",
                FailedStage::Discovery,
            )),
        }
    }

    #[test]
    fn test_every_error_code_is_retryable() {
        for code in [
            ErrorCode::ScanFailed,
            ErrorCode::Timeout,
            ErrorCode::WriteFailed,
            ErrorCode::DepsMissing,
        ] {
            assert!(code.retryable());
        }
    }

    #[test]
    fn test_artifact_json_uses_wire_names() {
        let json: serde_json::Value =
            serde_json::from_str(&failure_artifact().to_sorted_json().unwrap()).unwrap();
        assert_eq!(json["schema_version"], "repomap_artifact_v1");
        assert_eq!(json["provenance"]["method"], "none");
        assert_eq!(json["provenance"]["pagerank_backend"], "none");
        assert_eq!(json["error"]["code"], "timeout");
        assert_eq!(json["error"]["failed_stage"], "discovery");
        assert_eq!(json["error"]["retryable"], true);
        assert_eq!(json["stats"]["files_parsed"], 0);
    }

    #[test]
    fn test_artifact_json_keys_are_sorted() {
        let raw = failure_artifact().to_sorted_json().unwrap();
        let error_pos = raw.find("\"error\"").unwrap();
        let ok_pos = raw.find("\"ok\"").unwrap();
        let text_pos = raw.find("\"text\"").unwrap();
        assert!(error_pos < ok_pos && ok_pos < text_pos);
    }

    #[test]
    fn test_ok_artifact_omits_error_key() {
        let mut artifact = failure_artifact();
        artifact.ok = true;
        artifact.error = None;
        let json = serde_json::to_value(&artifact).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_ranking_score_rounds_to_six_places() {
        let entry = RankingEntry {
            path: "a.py".to_string(),
            score: 1.234_567_89,
            symbols: vec![],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["score"].as_f64().unwrap(), 1.234568);
    }

    #[test]
    fn test_match_scores_round_to_three_places() {
        let m = MatchResult {
            entry_id: 3,
            score: 0.456_78,
            summary: String::new(),
            reason: String::new(),
            files: vec![],
            keyword_overlap: vec![],
            file_overlap: vec![],
            semantic_score: 0.333_33,
            created_at: String::new(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["score"].as_f64().unwrap(), 0.457);
        assert_eq!(json["semantic_score"].as_f64().unwrap(), 0.333);
    }
}
