//! SQL DDL for all index tables.
//!
//! Defines `signatures`, `index_stats` (running totals), `ingest_log`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- One row per indexed source URL
CREATE TABLE IF NOT EXISTS signatures (
    source_url TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL UNIQUE,
    signature TEXT NOT NULL,
    primary_frequency REAL NOT NULL,
    category_tag TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    ingested_at TEXT NOT NULL,
    last_accessed TEXT,
    access_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_signatures_frequency ON signatures(primary_frequency);
CREATE INDEX IF NOT EXISTS idx_signatures_category ON signatures(category_tag, primary_frequency);

-- Running totals, single row
CREATE TABLE IF NOT EXISTS index_stats (
    id INTEGER PRIMARY KEY CHECK(id = 1),
    total_sources INTEGER NOT NULL DEFAULT 0,
    total_words INTEGER NOT NULL DEFAULT 0,
    frequency_sum REAL NOT NULL DEFAULT 0.0,
    updated_at TEXT
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO index_stats (id, total_sources, total_words, frequency_sum) \
         VALUES (1, 0, 0, 0.0)",
        [],
    )?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"signatures".to_string()));
        assert!(tables.contains(&"index_stats".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='signatures'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(indexes.contains(&"idx_signatures_frequency".to_string()));
        assert!(indexes.contains(&"idx_signatures_category".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM index_stats", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
