//! Cortex core library: repo-map and failure-graveyard engines for coding
//! agents.
//!
//! The repo-map engine scans a scoped subtree, extracts symbols and import
//! edges, ranks files with static heuristics plus PageRank, and persists a
//! byte-bounded text map as a JSON artifact. The graveyard engine records
//! failed attempts and retrieves similar past failures for a new one.
//!
//! With the `python` feature the crate also builds the `_cortex_core`
//! extension module.

pub mod config;
pub mod errors;
pub mod graveyard;
pub mod guards;
pub mod models;
#[cfg(feature = "python")]
pub mod python;
pub mod repomap;
pub mod store;

pub use config::CortexConfig;
pub use errors::{CortexError, CortexResult};
pub use graveyard::Graveyard;
pub use repomap::{run_repomap, RepoMapRequest, RepoMapRun};
pub use store::{FailureStore, MemoryFailureStore, SqliteFailureStore};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn _cortex_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}
