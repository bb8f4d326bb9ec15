//! Explicit removal of an indexed source.

use rusqlite::{params, Connection, OptionalExtension};

use super::store::{adjust_totals, write_ingest_log, LogOutcome};
use crate::error::StoreError;

/// Delete the row for `source_url` and subtract it from the running totals.
///
/// Returns `false` if nothing was stored under that URL.
pub fn delete_source(conn: &mut Connection, source_url: &str) -> Result<bool, StoreError> {
    let tx = conn.transaction()?;

    let row: Option<(i64, f64, String)> = tx
        .query_row(
            "SELECT word_count, primary_frequency, content_hash FROM signatures WHERE source_url = ?1",
            params![source_url],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((word_count, frequency, content_hash)) = row else {
        return Ok(false);
    };

    tx.execute(
        "DELETE FROM signatures WHERE source_url = ?1",
        params![source_url],
    )?;
    adjust_totals(&tx, -1, -word_count, -frequency)?;
    write_ingest_log(
        &tx,
        source_url,
        LogOutcome::Deleted,
        Some(&serde_json::json!({ "content_hash": content_hash })),
    )?;

    tx.commit()?;
    tracing::info!(url = source_url, "source removed from index");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::index::stats::index_stats;
    use crate::index::store::upsert_signature;
    use crate::signature::SignatureEncoder;

    #[test]
    fn test_delete_restores_totals_and_frees_hash() {
        let mut conn = db::open_memory_database().unwrap();
        let sig = SignatureEncoder::default()
            .encode("Migrating birds navigate using the earth's magnetic field")
            .unwrap()
            .unwrap();
        upsert_signature(&mut conn, "https://birds.example/a", &sig).unwrap();

        assert!(delete_source(&mut conn, "https://birds.example/a").unwrap());
        assert!(!delete_source(&mut conn, "https://birds.example/a").unwrap());

        let stats = index_stats(&conn).unwrap();
        assert_eq!(stats.total_sources, 0);
        assert_eq!(stats.total_words, 0);

        // the same content may now be stored under another URL
        assert!(upsert_signature(&mut conn, "https://birds.example/b", &sig).unwrap());
    }
}
