//! SQLite-backed failure store.
//!
//! Every public method opens its own connection so callers never manage
//! connection lifetime. Writes are retried when another process holds the
//! database lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use rusqlite::{params, Connection, ErrorCode as SqliteCode};
use tracing::debug;

use crate::errors::{CortexError, CortexResult};
use crate::guards::MAX_FTS_TERMS;
use crate::models::{FailureRecord, NewFailure};
use crate::store::schema::{self, CREATE_FTS_SCRATCH, FTS_SCRATCH_TABLE};
use crate::store::{sorted_unique, utc_now, FailureStore, Narrowing};

static FTS_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOCK_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOCK_RETRY_BACKOFF_MS: u64 = 25;

/// Row as stored, before the JSON columns are decoded.
struct RawRow {
    id: i64,
    session_id: Option<String>,
    summary: String,
    reason: String,
    files_json: String,
    keywords_json: String,
    created_at: String,
}

impl RawRow {
    fn into_record(self) -> CortexResult<FailureRecord> {
        Ok(FailureRecord {
            id: self.id,
            session_id: self.session_id,
            summary: self.summary,
            reason: self.reason,
            files: serde_json::from_str(&self.files_json)?,
            keywords: serde_json::from_str(&self.keywords_json)?,
            created_at: self.created_at,
        })
    }
}

fn is_lock_error(err: &CortexError) -> bool {
    match err {
        CortexError::Sqlite(rusqlite::Error::SqliteFailure(inner, _)) => matches!(
            inner.code,
            SqliteCode::DatabaseBusy | SqliteCode::DatabaseLocked
        ),
        _ => false,
    }
}

pub struct SqliteFailureStore {
    db_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub lock_retry_attempts: u32,
    pub lock_retry_backoff_ms: u64,
}

impl SqliteFailureStore {
    /// Open (creating if needed) the database at `db_path` and ensure the
    /// schema exists.
    pub fn open(db_path: impl AsRef<Path>) -> CortexResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            db_path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            lock_retry_attempts: DEFAULT_LOCK_RETRY_ATTEMPTS,
            lock_retry_backoff_ms: DEFAULT_LOCK_RETRY_BACKOFF_MS,
        };
        let conn = store.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        schema::init_schema(&conn)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> CortexResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        Ok(conn)
    }

    /// Run `operation` on a fresh connection, retrying lock errors with a
    /// linearly growing pause.
    fn run_write<T>(&self, operation: impl Fn(&Connection) -> CortexResult<T>) -> CortexResult<T> {
        let attempts = self.lock_retry_attempts + 1;
        let mut attempt = 0;
        loop {
            let result = self.connect().and_then(|conn| operation(&conn));
            match result {
                Err(err) if is_lock_error(&err) && attempt + 1 < attempts => {
                    debug!("Graveyard write hit a lock (attempt {}): {err}", attempt + 1);
                    if self.lock_retry_backoff_ms > 0 {
                        let pause = self.lock_retry_backoff_ms * u64::from(attempt + 1);
                        std::thread::sleep(Duration::from_millis(pause));
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn recent_rows(conn: &Connection, limit: usize) -> CortexResult<Vec<RawRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, summary, reason, files_json, keywords_json, created_at \
             FROM graveyard ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    summary: row.get(2)?,
                    reason: row.get(3)?,
                    files_json: row.get(4)?,
                    keywords_json: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl FailureStore for SqliteFailureStore {
    fn append_failure(&self, failure: NewFailure) -> CortexResult<FailureRecord> {
        let keywords = sorted_unique(&failure.keywords);
        let files_json = serde_json::to_string(&failure.files)?;
        let keywords_json = serde_json::to_string(&keywords)?;
        let created_at = utc_now();

        let id = self.run_write(|conn| {
            conn.execute(
                "INSERT INTO graveyard (session_id, summary, reason, files_json, keywords_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    failure.session_id,
                    failure.summary,
                    failure.reason,
                    files_json,
                    keywords_json,
                    created_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(FailureRecord {
            id,
            session_id: failure.session_id,
            summary: failure.summary,
            reason: failure.reason,
            files: failure.files,
            keywords,
            created_at,
        })
    }

    fn recent_failures(&self, limit: usize) -> CortexResult<Vec<FailureRecord>> {
        let conn = self.connect()?;
        Self::recent_rows(&conn, limit)?
            .into_iter()
            .map(RawRow::into_record)
            .collect()
    }

    fn narrow_candidates(
        &self,
        tokens: &[String],
        window: usize,
        candidate_limit: usize,
    ) -> CortexResult<Narrowing> {
        let terms: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| FTS_TOKEN_RE.is_match(t))
            .take(MAX_FTS_TERMS)
            .collect();
        if terms.is_empty() {
            return Ok(Narrowing::Candidates(Vec::new()));
        }
        let conn = self.connect()?;
        let rows = Self::recent_rows(&conn, window)?;
        if rows.is_empty() {
            return Ok(Narrowing::Candidates(Vec::new()));
        }

        let scratch_ready = conn
            .execute_batch(CREATE_FTS_SCRATCH)
            .and_then(|_| conn.execute(&format!("DELETE FROM {FTS_SCRATCH_TABLE}"), []));
        if let Err(e) = scratch_ready {
            debug!("FTS5 scratch index unavailable: {e}");
            return Ok(Narrowing::Unsupported);
        }

        let tx = conn.unchecked_transaction()?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {FTS_SCRATCH_TABLE}(entry_id, text) VALUES (?1, ?2)"
            ))?;
            for row in &rows {
                let text = format!("{} {} {}", row.summary, row.reason, row.keywords_json);
                insert.execute(params![row.id.to_string(), text])?;
            }
        }
        tx.commit()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT entry_id FROM {FTS_SCRATCH_TABLE} \
             WHERE {FTS_SCRATCH_TABLE} MATCH ?1 \
             ORDER BY bm25({FTS_SCRATCH_TABLE}), CAST(entry_id AS INTEGER) DESC \
             LIMIT ?2"
        ))?;
        let match_query = terms.join(" OR ");
        let limit = candidate_limit.max(1) as i64;
        let matched: Vec<String> = stmt
            .query_map(params![match_query, limit], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_id: HashMap<i64, RawRow> = rows.into_iter().map(|r| (r.id, r)).collect();
        let mut candidates = Vec::with_capacity(matched.len());
        for entry_id in matched {
            let Ok(id) = entry_id.parse::<i64>() else {
                continue;
            };
            if let Some(row) = by_id.remove(&id) {
                candidates.push(row.into_record()?);
            }
        }
        Ok(Narrowing::Candidates(candidates))
    }
}
