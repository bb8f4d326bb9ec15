//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::{Context, Result};

use resonant::config::ResonantConfig;
use resonant::db;
use resonant::ingest::{DiskProbe, Manifest, StorageProbe};

/// Run database diagnostics and print a health report.
pub fn doctor(config: &ResonantConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `resonant learn <url>` or `resonant ingest <tier>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn =
        db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Resonant Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    match report.signature_version {
        Some(v) if v != resonant::signature::SCHEMA_VERSION => println!(
            "Signature version: {v} (WARNING: this build encodes v{}; stored rows will be skipped)",
            resonant::signature::SCHEMA_VERSION
        ),
        Some(v) => println!("Signature version: {v}"),
        None => println!("Signature version: (not set)"),
    }
    println!();
    println!("Row counts:");
    println!("  Signatures:      {}", report.signature_count);
    println!("  Ingest log:      {}", report.log_count);
    println!();

    let probe = DiskProbe::for_database(&db_path);
    match probe.available_bytes() {
        Ok(free) => {
            let status = if free < config.storage.min_free_bytes {
                "LOW (batch ingestion will pause)"
            } else {
                "OK"
            };
            println!("Free space:        {} ({status})", format_bytes(free));
        }
        Err(e) => println!("Free space:        unknown ({e})"),
    }

    let manifest_path = config.resolved_manifest_path();
    match Manifest::load(&manifest_path) {
        Ok(m) => println!(
            "Manifest:          {} ({} tier(s))",
            manifest_path.display(),
            m.tiers.len()
        ),
        Err(e) => println!("Manifest:          unavailable ({e:#})"),
    }
    println!();

    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or delete the database and re-run `resonant ingest --all`.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
