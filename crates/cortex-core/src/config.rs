//! Engine configuration loaded from TOML with environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CortexResult;
use crate::guards::{DEFAULT_CANDIDATE_LIMIT, DEFAULT_FAILURE_WINDOW};

pub const ENV_REPOMAP_PREFER_AST: &str = "CORTEX_REPOMAP_PREFER_AST";
pub const ENV_GRAVEYARD_ENABLED: &str = "CORTEX_GRAVEYARD_ENABLED";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CortexConfig {
    pub repomap: RepoMapConfig,
    pub graveyard: GraveyardConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoMapConfig {
    /// Build import edges and run PageRank on top of the static heuristics.
    pub prefer_ast_graph: bool,
    pub watch_paths: Vec<String>,
    pub ignored_dirs: Vec<String>,
    pub max_ranked_files: usize,
    pub max_text_bytes: usize,
    pub artifact_path: String,
    pub session_artifact_dir: String,
}

impl Default for RepoMapConfig {
    fn default() -> Self {
        Self {
            prefer_ast_graph: true,
            watch_paths: vec!["src".to_string()],
            ignored_dirs: ["node_modules", "dist", "build", ".git", ".cortex", "__pycache__"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_ranked_files: 20,
            max_text_bytes: 8192,
            artifact_path: ".cortex/artifacts/repomap/latest.json".to_string(),
            session_artifact_dir: ".cortex/artifacts/repomap".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraveyardConfig {
    pub enabled: bool,
    pub max_matches: usize,
    pub similarity_threshold: f64,
    pub min_keyword_overlap: usize,
    /// Number of most recent records considered per query.
    pub window: usize,
    pub candidate_limit: usize,
}

impl Default for GraveyardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_matches: 5,
            similarity_threshold: 0.35,
            min_keyword_overlap: 1,
            window: DEFAULT_FAILURE_WINDOW,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

impl CortexConfig {
    pub fn from_toml_str(raw: &str) -> CortexResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load config from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> CortexResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_flag(ENV_REPOMAP_PREFER_AST) {
            self.repomap.prefer_ast_graph = value;
        }
        if let Some(value) = env_flag(ENV_GRAVEYARD_ENABLED) {
            self.graveyard.enabled = value;
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|val| parse_flag(&val))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = CortexConfig::default();
        assert!(config.repomap.prefer_ast_graph);
        assert_eq!(config.repomap.watch_paths, vec!["src".to_string()]);
        assert_eq!(config.repomap.max_ranked_files, 20);
        assert_eq!(config.repomap.max_text_bytes, 8192);
        assert_eq!(config.graveyard.max_matches, 5);
        assert!((config.graveyard.similarity_threshold - 0.35).abs() < 1e-12);
        assert_eq!(config.graveyard.min_keyword_overlap, 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = "\
[repomap]
max_ranked_files = 7
watch_paths = [\"lib\"]

[graveyard]
similarity_threshold = 0.2
";
        let config = CortexConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.repomap.max_ranked_files, 7);
        assert_eq!(config.repomap.watch_paths, vec!["lib".to_string()]);
        assert_eq!(config.repomap.max_text_bytes, 8192);
        assert!((config.graveyard.similarity_threshold - 0.2).abs() < 1e-12);
        assert!(config.graveyard.enabled);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CortexConfig::from_toml_str("[repomap\nmax = ").unwrap_err();
        assert!(matches!(err, crate::errors::CortexError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CortexConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CortexConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cortex.toml");
        std::fs::write(&path, "[graveyard]\nenabled = false\n").unwrap();
        let config = CortexConfig::load(&path).unwrap();
        assert!(!config.graveyard.enabled);
    }

    #[test]
    fn test_parse_flag_values() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
