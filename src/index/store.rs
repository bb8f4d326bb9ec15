//! Write path: upsert with duplicate-content detection, running totals, and
//! the ingest audit log.
//!
//! [`upsert_signature`] runs as one transaction: the content-hash check, the
//! row write and the `index_stats` adjustment commit together or not at all.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;

use crate::error::StoreError;
use crate::signature::Signature;

/// Terminal state recorded in `ingest_log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    Indexed,
    Skipped,
    Duplicate,
    Failed,
    Deleted,
}

impl LogOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Skipped => "skipped",
            Self::Duplicate => "duplicate",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }
}

/// Insert or overwrite the row for `source_url`.
///
/// Returns `true` when a new row was created, `false` when an existing row for
/// the same URL was overwritten. Fails with [`StoreError::DuplicateContent`]
/// when the content hash is already stored under a different URL; the
/// rejection is still written to the audit log.
pub fn upsert_signature(
    conn: &mut Connection,
    source_url: &str,
    signature: &Signature,
) -> Result<bool, StoreError> {
    let tx = conn.transaction()?;
    let content_hash = signature.content_hash();

    let holder: Option<String> = tx
        .query_row(
            "SELECT source_url FROM signatures WHERE content_hash = ?1",
            params![content_hash],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(existing_url) = holder.filter(|u| u != source_url) {
        write_ingest_log(
            &tx,
            source_url,
            LogOutcome::Duplicate,
            Some(&serde_json::json!({
                "content_hash": content_hash,
                "existing_url": existing_url,
            })),
        )?;
        tx.commit()?;
        return Err(StoreError::DuplicateContent {
            content_hash: content_hash.to_string(),
            existing_url,
        });
    }

    let previous: Option<(i64, f64)> = tx
        .query_row(
            "SELECT word_count, primary_frequency FROM signatures WHERE source_url = ?1",
            params![source_url],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let json = signature.to_json()?;
    let word_count = signature.text_features.word_count as i64;
    let now = chrono::Utc::now().to_rfc3339();

    tx.execute(
        "INSERT INTO signatures \
             (source_url, content_hash, signature, primary_frequency, category_tag, word_count, ingested_at, access_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0) \
         ON CONFLICT(source_url) DO UPDATE SET \
             content_hash = excluded.content_hash, \
             signature = excluded.signature, \
             primary_frequency = excluded.primary_frequency, \
             category_tag = excluded.category_tag, \
             word_count = excluded.word_count, \
             ingested_at = excluded.ingested_at",
        params![
            source_url,
            content_hash,
            json,
            signature.primary_frequency,
            signature.category_tag.to_string(),
            word_count,
            now,
        ],
    )?;

    let (old_words, old_frequency) = previous.unwrap_or((0, 0.0));
    let added_sources = if previous.is_some() { 0 } else { 1 };
    adjust_totals(
        &tx,
        added_sources,
        word_count - old_words,
        signature.primary_frequency - old_frequency,
    )?;

    write_ingest_log(
        &tx,
        source_url,
        LogOutcome::Indexed,
        Some(&serde_json::json!({
            "content_hash": content_hash,
            "primary_frequency": signature.primary_frequency,
            "category_tag": signature.category_tag,
            "overwrite": previous.is_some(),
        })),
    )?;

    tx.commit()?;
    Ok(previous.is_none())
}

/// Apply deltas to the single `index_stats` row.
pub(crate) fn adjust_totals(
    tx: &Transaction,
    sources: i64,
    words: i64,
    frequency: f64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE index_stats SET \
             total_sources = total_sources + ?1, \
             total_words = total_words + ?2, \
             frequency_sum = frequency_sum + ?3, \
             updated_at = ?4 \
         WHERE id = 1",
        params![sources, words, frequency, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Bump `access_count` and `last_accessed` for every URL returned by a search.
pub fn record_access(conn: &mut Connection, urls: &[String]) -> Result<(), StoreError> {
    if urls.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    {
        let mut stmt = tx.prepare(
            "UPDATE signatures SET access_count = access_count + 1, last_accessed = ?1 \
             WHERE source_url = ?2",
        )?;
        for url in urls {
            stmt.execute(params![now, url])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Write an entry to the `ingest_log` audit table.
pub(crate) fn write_ingest_log(
    conn: &Connection,
    source_url: &str,
    outcome: LogOutcome,
    details: Option<&serde_json::Value>,
) -> Result<(), StoreError> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO ingest_log (source_url, outcome, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![source_url, outcome.as_str(), details_json, now],
    )?;
    Ok(())
}
