//! Read path: point lookups, the frequency-band prefilter, and bounded scans.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::signature::{CategoryTag, Signature};

pub fn exists(conn: &Connection, source_url: &str) -> Result<bool, StoreError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM signatures WHERE source_url = ?1)",
        params![source_url],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Stored signature for `source_url`. A row that fails to decode is an error here.
pub fn get(conn: &Connection, source_url: &str) -> Result<Option<Signature>, StoreError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT signature FROM signatures WHERE source_url = ?1",
            params![source_url],
            |row| row.get(0),
        )
        .optional()?;
    json.map(|j| Signature::from_json(&j).map_err(StoreError::from))
        .transpose()
}

/// Rows with `primary_frequency` in `[min_freq, max_freq]`, closest to the
/// band midpoint first.
///
/// Served by `idx_signatures_frequency`, or `idx_signatures_category` when a
/// category is given.
pub fn range_query(
    conn: &Connection,
    min_freq: f64,
    max_freq: f64,
    category: Option<CategoryTag>,
    limit: usize,
) -> Result<Vec<(String, Signature)>, StoreError> {
    if min_freq.is_nan() || max_freq.is_nan() || min_freq > max_freq || limit == 0 {
        return Ok(Vec::new());
    }
    let midpoint = (min_freq + max_freq) / 2.0;
    let limit = limit as i64;

    match category {
        Some(tag) => {
            let mut stmt = conn.prepare(
                "SELECT source_url, signature FROM signatures \
                 WHERE category_tag = ?1 AND primary_frequency BETWEEN ?2 AND ?3 \
                 ORDER BY ABS(primary_frequency - ?4), source_url \
                 LIMIT ?5",
            )?;
            let rows = stmt.query_map(
                params![tag.to_string(), min_freq, max_freq, midpoint, limit],
                url_and_json,
            )?;
            decode_rows(rows)
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT source_url, signature FROM signatures \
                 WHERE primary_frequency BETWEEN ?1 AND ?2 \
                 ORDER BY ABS(primary_frequency - ?3), source_url \
                 LIMIT ?4",
            )?;
            let rows = stmt.query_map(params![min_freq, max_freq, midpoint, limit], url_and_json)?;
            decode_rows(rows)
        }
    }
}

/// Up to `limit` rows regardless of frequency, most-accessed first.
pub fn scan(conn: &Connection, limit: usize) -> Result<Vec<(String, Signature)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT source_url, signature FROM signatures \
         ORDER BY access_count DESC, source_url \
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], url_and_json)?;
    decode_rows(rows)
}

fn url_and_json(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

/// Decode every row, skipping (and logging) any whose signature no longer parses.
fn decode_rows<I>(rows: I) -> Result<Vec<(String, Signature)>, StoreError>
where
    I: Iterator<Item = rusqlite::Result<(String, String)>>,
{
    let mut out = Vec::new();
    for row in rows {
        let (url, json) = row?;
        match Signature::from_json(&json) {
            Ok(sig) => out.push((url, sig)),
            Err(e) => tracing::warn!(url = %url, error = %e, "skipping undecodable signature row"),
        }
    }
    Ok(out)
}
