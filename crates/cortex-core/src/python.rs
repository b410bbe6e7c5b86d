//! PyO3 bindings for the `_cortex_core` extension module.
//!
//! Results cross the boundary as plain dicts and lists built from the
//! serde representation, so Python callers see the same keys as the
//! on-disk artifact.

use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::config::CortexConfig;
use crate::errors::CortexError;
use crate::graveyard::Graveyard;
use crate::repomap::{self, RepoMapRequest};
use crate::store::SqliteFailureStore;

fn to_py<T: serde::Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let text = serde_json::to_string(value).map_err(CortexError::from)?;
    Ok(py.import("json")?.call_method1("loads", (text,))?.unbind())
}

fn load_config(config_path: Option<PathBuf>) -> Result<CortexConfig, CortexError> {
    let mut config = match config_path {
        Some(path) => CortexConfig::load(&path)?,
        None => CortexConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Build and persist a repo map, returning the artifact as a dict with
/// `artifact_path` and `session_artifact_path` when written.
#[pyfunction]
#[pyo3(signature = (
    root,
    scope=None,
    focus_files=None,
    max_files=None,
    max_text_bytes=None,
    output_path=None,
    session_id=None,
    timeout_ms=None,
    config_path=None
))]
#[allow(clippy::too_many_arguments)]
fn run_repomap(
    py: Python<'_>,
    root: PathBuf,
    scope: Option<Vec<String>>,
    focus_files: Option<Vec<String>>,
    max_files: Option<usize>,
    max_text_bytes: Option<usize>,
    output_path: Option<String>,
    session_id: Option<String>,
    timeout_ms: Option<i64>,
    config_path: Option<PathBuf>,
) -> PyResult<PyObject> {
    let config = load_config(config_path)?;
    let request = RepoMapRequest {
        root,
        scope,
        focus_files: focus_files.unwrap_or_default(),
        max_files,
        max_text_bytes,
        output_path,
        session_id,
        timeout_ms,
    };
    let run = py.allow_threads(|| repomap::run_repomap(&request, &config.repomap));
    let value = run.to_json().map_err(CortexError::from)?;
    to_py(py, &value)
}

#[pyclass(name = "Graveyard")]
pub struct PyGraveyard {
    inner: Graveyard<SqliteFailureStore>,
}

#[pymethods]
impl PyGraveyard {
    #[new]
    #[pyo3(signature = (db_path, config_path=None))]
    fn new(db_path: PathBuf, config_path: Option<PathBuf>) -> PyResult<Self> {
        let config = load_config(config_path)?;
        let store = SqliteFailureStore::open(db_path)?;
        Ok(Self {
            inner: Graveyard::new(store, config.graveyard),
        })
    }

    #[getter]
    fn db_path(&self) -> String {
        self.inner.store().db_path().to_string_lossy().into_owned()
    }

    /// Returns the stored record as a dict, or `None` when disabled.
    #[pyo3(signature = (session_id, summary, reason, files=None))]
    fn record_failure(
        &self,
        py: Python<'_>,
        session_id: Option<String>,
        summary: &str,
        reason: &str,
        files: Option<Vec<String>>,
    ) -> PyResult<Option<PyObject>> {
        let files = files.unwrap_or_default();
        let record = self
            .inner
            .record_failure(session_id.as_deref(), summary, reason, &files)?;
        record.map(|r| to_py(py, &r)).transpose()
    }

    #[pyo3(signature = (summary, files=None, max_matches=None))]
    fn find_similar(
        &self,
        py: Python<'_>,
        summary: &str,
        files: Option<Vec<String>>,
        max_matches: Option<usize>,
    ) -> PyResult<PyObject> {
        let files = files.unwrap_or_default();
        let matches = self.inner.find_similar(summary, &files, max_matches);
        to_py(py, &matches)
    }
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_repomap, m)?)?;
    m.add_class::<PyGraveyard>()?;
    m.add("REPOMAP_SCHEMA_VERSION", crate::models::REPOMAP_SCHEMA_VERSION)?;
    Ok(())
}
