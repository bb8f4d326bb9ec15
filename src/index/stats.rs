use rusqlite::Connection;
use serde::Serialize;

use crate::error::StoreError;

/// Aggregate view of the index, read from the running-totals row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_sources: u64,
    pub total_words: u64,
    pub avg_frequency: f64,
}

pub fn index_stats(conn: &Connection) -> Result<IndexStats, StoreError> {
    let (sources, words, frequency_sum): (i64, i64, f64) = conn.query_row(
        "SELECT total_sources, total_words, frequency_sum FROM index_stats WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let avg_frequency = if sources > 0 {
        frequency_sum / sources as f64
    } else {
        0.0
    };

    Ok(IndexStats {
        total_sources: sources.max(0) as u64,
        total_words: words.max(0) as u64,
        avg_frequency,
    })
}
