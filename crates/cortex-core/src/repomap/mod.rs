//! Repo-map engine: scan a scoped subtree, extract symbols and import edges,
//! rank files and persist a byte-bounded summary artifact.
//!
//! `run_repomap` never returns an error. Discovery failures, timeouts and
//! write failures become `ok = false` artifacts carrying a stable error
//! code and the stage that failed.

pub mod discovery;
pub mod extract;
pub mod imports;
pub mod pagerank;
#[cfg(feature = "python-ast")]
pub mod parser;
pub mod paths;
pub mod ranking;
pub mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::RepoMapConfig;
use crate::errors::{CortexError, CortexResult};
use crate::guards::{clamp_max_files, clamp_text_budget};
use crate::models::{
    ArtifactError, ErrorCode, FailedStage, PagerankBackend, Provenance, RepoMapArtifact,
    RepoMapMethod, RepoMapStats, REPOMAP_SCHEMA_VERSION,
};

/// Elapsed-time source for timeout checks and provenance timing.
pub trait Clock {
    fn elapsed_ms(&self) -> u64;
}

/// Wall clock measured from construction.
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Caller inputs for one run. `None` fields fall back to `RepoMapConfig`.
#[derive(Clone, Debug, Default)]
pub struct RepoMapRequest {
    pub root: PathBuf,
    /// An explicit scope disables the scope fallback probe.
    pub scope: Option<Vec<String>>,
    pub focus_files: Vec<String>,
    pub max_files: Option<usize>,
    pub max_text_bytes: Option<usize>,
    pub output_path: Option<String>,
    pub session_id: Option<String>,
    /// `None` never expires; `<= 0` is already expired.
    pub timeout_ms: Option<i64>,
}

impl RepoMapRequest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RepoMapRun {
    pub artifact: RepoMapArtifact,
    pub artifact_path: Option<PathBuf>,
    pub session_artifact_path: Option<PathBuf>,
}

impl RepoMapRun {
    pub fn ok(&self) -> bool {
        self.artifact.ok
    }

    /// Artifact JSON value with the written paths merged in.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(&self.artifact)?;
        if let Some(map) = value.as_object_mut() {
            if let Some(path) = &self.artifact_path {
                map.insert("artifact_path".into(), path.to_string_lossy().into_owned().into());
            }
            if let Some(path) = &self.session_artifact_path {
                map.insert(
                    "session_artifact_path".into(),
                    path.to_string_lossy().into_owned().into(),
                );
            }
        }
        Ok(value)
    }
}

/// Optional backends compiled out of this build.
pub fn missing_dependencies() -> Vec<String> {
    let mut missing = Vec::new();
    if !cfg!(feature = "graph") {
        missing.push("petgraph".to_string());
    }
    if !cfg!(feature = "python-ast") {
        missing.push("tree-sitter-python".to_string());
    }
    missing.sort();
    missing
}

fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn timed_out(clock: &dyn Clock, timeout_ms: Option<i64>) -> bool {
    match timeout_ms {
        None => false,
        Some(budget) if budget <= 0 => true,
        Some(budget) => clock.elapsed_ms() > budget as u64,
    }
}

struct RunContext<'a> {
    root: PathBuf,
    scope: Vec<String>,
    focus_files: Vec<String>,
    timeout_ms: Option<i64>,
    prefer_ast: bool,
    clock: &'a dyn Clock,
}

impl RunContext<'_> {
    fn provenance(&self, method: RepoMapMethod, backend: PagerankBackend) -> Provenance {
        Provenance {
            method,
            source_root: self.root.to_string_lossy().into_owned(),
            scope: self.scope.clone(),
            focus_files: self.focus_files.clone(),
            duration_ms: self.clock.elapsed_ms(),
            timeout_ms: self.timeout_ms,
            ast_requested: self.prefer_ast,
            ast_enabled: self.prefer_ast,
            missing_deps: missing_dependencies(),
            pagerank_backend: backend,
        }
    }

    fn failure(&self, code: ErrorCode, message: String, stage: FailedStage) -> RepoMapRun {
        warn!("Repo-map run failed at {stage:?}: {message}");
        RepoMapRun {
            artifact: RepoMapArtifact {
                schema_version: REPOMAP_SCHEMA_VERSION.to_string(),
                ok: false,
                generated_at: now_iso8601(),
                provenance: self.provenance(RepoMapMethod::None, PagerankBackend::None),
                stats: RepoMapStats::default(),
                ranking: Vec::new(),
                text: String::new(),
                error: Some(ArtifactError::new(code, message, stage)),
            },
            artifact_path: None,
            session_artifact_path: None,
        }
    }
}

pub fn run_repomap(request: &RepoMapRequest, config: &RepoMapConfig) -> RepoMapRun {
    let clock = SystemClock::start();
    run_repomap_with_clock(request, config, &clock)
}

pub fn run_repomap_with_clock(
    request: &RepoMapRequest,
    config: &RepoMapConfig,
    clock: &dyn Clock,
) -> RepoMapRun {
    let root = std::fs::canonicalize(&request.root).unwrap_or_else(|_| request.root.clone());
    let requested_scope = request.scope.clone().unwrap_or_else(|| config.watch_paths.clone());
    let ctx = RunContext {
        scope: discovery::select_scope(&root, &requested_scope, request.scope.is_some()),
        root,
        focus_files: request.focus_files.clone(),
        timeout_ms: request.timeout_ms,
        prefer_ast: config.prefer_ast_graph,
        clock,
    };
    let max_files = clamp_max_files(request.max_files.unwrap_or(config.max_ranked_files));
    let max_text_bytes = clamp_text_budget(request.max_text_bytes.unwrap_or(config.max_text_bytes));

    if !ctx.root.is_dir() {
        let message = CortexError::RootMissing(ctx.root.clone()).to_string();
        return ctx.failure(ErrorCode::ScanFailed, message, FailedStage::Discovery);
    }
    if timed_out(clock, ctx.timeout_ms) {
        return ctx.failure(
            ErrorCode::Timeout,
            "Repo-map generation timed out before discovery started.".to_string(),
            FailedStage::Discovery,
        );
    }

    let timeout_ms = ctx.timeout_ms;
    let files = match discovery::discover_files(&ctx.root, &ctx.scope, &config.ignored_dirs, &|| {
        timed_out(clock, timeout_ms)
    }) {
        Ok(files) => files,
        Err(CortexError::Timeout) => {
            return ctx.failure(
                ErrorCode::Timeout,
                "Repo-map generation timed out during file discovery.".to_string(),
                FailedStage::Discovery,
            )
        }
        Err(e) => {
            return ctx.failure(
                ErrorCode::ScanFailed,
                format!("Failed during file discovery: {e}"),
                FailedStage::Discovery,
            )
        }
    };

    let analyses = extract::analyze_files(&ctx.root, &files);
    let mut edges = Vec::new();
    let mut graph_scores = BTreeMap::new();
    let mut backend = PagerankBackend::None;
    let mut method = RepoMapMethod::HeuristicFallback;
    if ctx.prefer_ast {
        edges = imports::build_dependency_edges(&analyses);
        let nodes: Vec<String> = analyses.iter().map(|a| a.path.clone()).collect();
        (graph_scores, backend) = pagerank::pagerank_scores(&nodes, &edges);
        method = RepoMapMethod::AstPagerank;
    }
    let ranking = ranking::rank_files(&analyses, &ctx.focus_files, max_files, &graph_scores);
    let text = render::render_text(&ranking, max_text_bytes);

    let artifact = RepoMapArtifact {
        schema_version: REPOMAP_SCHEMA_VERSION.to_string(),
        ok: true,
        generated_at: now_iso8601(),
        provenance: ctx.provenance(method, backend),
        stats: RepoMapStats {
            files_parsed: files.len(),
            symbols_found: analyses.iter().map(|a| a.symbol_count).sum(),
            graph_edges: edges.len(),
            byte_count: text.len(),
        },
        ranking,
        text,
        error: None,
    };

    let latest = resolve_output_path(
        &ctx.root,
        request.output_path.as_deref().unwrap_or(&config.artifact_path),
    );
    let session = request.session_id.as_deref().filter(|sid| !sid.is_empty()).map(|sid| {
        ctx.root
            .join(&config.session_artifact_dir)
            .join(format!("{sid}.json"))
    });
    if let Err(e) = persist(&artifact, &latest, session.as_deref()) {
        return ctx.failure(
            ErrorCode::WriteFailed,
            format!("Failed to write repo-map artifact: {e}"),
            FailedStage::Write,
        );
    }

    info!(
        "Repo-map built: {} files, {} symbols, {} edges, {} bytes ({})",
        artifact.stats.files_parsed,
        artifact.stats.symbols_found,
        artifact.stats.graph_edges,
        artifact.stats.byte_count,
        artifact.provenance.pagerank_backend.as_str(),
    );
    RepoMapRun {
        artifact,
        artifact_path: Some(latest),
        session_artifact_path: session,
    }
}

fn resolve_output_path(root: &Path, output: &str) -> PathBuf {
    let candidate = Path::new(output);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

fn write_json(path: &Path, body: &str) -> CortexResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}

fn persist(artifact: &RepoMapArtifact, latest: &Path, session: Option<&Path>) -> CortexResult<()> {
    let body = artifact.to_sorted_json()?;
    write_json(latest, &body)?;
    if let Some(session) = session {
        write_json(session, &body)?;
    }
    Ok(())
}
