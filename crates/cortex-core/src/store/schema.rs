//! SQLite DDL for the failure graveyard.

use rusqlite::Connection;

use crate::errors::CortexResult;

pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS graveyard (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT,
        summary TEXT NOT NULL,
        reason TEXT NOT NULL,
        files_json TEXT NOT NULL DEFAULT '[]',
        keywords_json TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_graveyard_session ON graveyard(session_id);",
];

/// Connection-local scratch index rebuilt for every narrowing query.
pub const FTS_SCRATCH_TABLE: &str = "_cortex_graveyard_fts";

pub const CREATE_FTS_SCRATCH: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS temp._cortex_graveyard_fts \
     USING fts5(entry_id UNINDEXED, text);";

pub fn init_schema(conn: &Connection) -> CortexResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name IN ('graveyard', 'idx_graveyard_session')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_fts_scratch_table_can_be_created() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_FTS_SCRATCH).unwrap();
        conn.execute_batch(CREATE_FTS_SCRATCH).unwrap();
        conn.execute(
            &format!("INSERT INTO {FTS_SCRATCH_TABLE}(entry_id, text) VALUES ('1', 'redis cache')"),
            [],
        )
        .unwrap();
        let in_temp: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_temp_master WHERE name = ?1",
                [FTS_SCRATCH_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(in_temp, 1);
        let hits: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {FTS_SCRATCH_TABLE} WHERE {FTS_SCRATCH_TABLE} MATCH 'cache'"),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
    }
}
