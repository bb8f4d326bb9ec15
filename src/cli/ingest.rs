//! CLI `learn` and `ingest` commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use resonant::engine::Engine;
use resonant::ingest::{BatchReport, IngestOutcome, ProgressFn, Source};

/// Ingest a single URL and print the outcome.
pub async fn learn(engine: &Engine, source: Source, force: bool) -> Result<()> {
    let report = engine.ingest_one(&source, force).await?;

    match &report.outcome {
        IngestOutcome::Indexed {
            primary_frequency,
            category_tag,
            created,
            ..
        } => {
            let verb = if *created { "Indexed" } else { "Re-indexed" };
            println!("{verb} {} ({category_tag}, {primary_frequency:.2} Hz)", source.url);
        }
        other => {
            println!("{}: {}", other.status(), serde_json::to_string(other)?);
        }
    }
    println!(
        "Index now holds {} source(s), {} word(s), avg frequency {:.2}",
        report.stats.total_sources, report.stats.total_words, report.stats.avg_frequency
    );
    Ok(())
}

pub struct IngestArgs {
    pub tier: Option<String>,
    pub all: bool,
    pub list: bool,
    pub concurrency: Option<usize>,
    pub delay_ms: Option<u64>,
    pub force: bool,
}

/// Ingest one manifest tier (or all of them) with a progress bar. Ctrl-C
/// stops the batch after the sources already in flight.
pub async fn ingest(engine: &Engine, args: IngestArgs) -> Result<()> {
    let manifest = engine.load_manifest()?;

    if args.list {
        println!("Tiers in {}:", engine.config().resolved_manifest_path().display());
        for tier in &manifest.tiers {
            println!("  {:<20} {:>4} source(s)  {}", tier.name, tier.sources.len(), tier.description);
        }
        return Ok(());
    }

    let sources = match (&args.tier, args.all) {
        (Some(name), false) => match manifest.tier(name) {
            Some(tier) => tier.sources.clone(),
            None => bail!(
                "unknown tier '{name}' (available: {})",
                manifest.tier_names().join(", ")
            ),
        },
        (None, true) => manifest.all_sources(),
        _ => bail!("pass exactly one of a tier name or --all"),
    };

    let mut options = engine.batch_options();
    options.force_reload = args.force;
    if let Some(n) = args.concurrency {
        options.max_concurrency = n.max(1);
    }
    if let Some(ms) = args.delay_ms {
        options.delay = Duration::from_millis(ms);
    }

    let pb = super::ingest_progress_bar(sources.len() as u64);
    let bar = pb.clone();
    let progress: ProgressFn = Arc::new(move |source: &Source, outcome: &IngestOutcome| {
        bar.set_message(format!("{} {}", outcome.status(), source.name));
        bar.inc(1);
    });

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after in-flight sources");
                cancel.cancel();
            }
        })
    };

    let report = engine
        .ingest_batch(sources, options, cancel, Some(progress))
        .await;
    ctrl_c.abort();
    pb.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("Batch Report");
    println!("{}", "=".repeat(40));
    println!("  Processed:           {}", report.processed);
    println!("  Indexed:             {}", report.successful);
    println!("  Skipped:             {}", report.skipped);
    println!("  Failed:              {}", report.failed);
    println!("  Elapsed:             {:.1}s", report.elapsed_seconds);
    println!("  Sources/minute:      {:.1}", report.sources_per_minute);
    if report.paused {
        println!();
        println!(
            "Paused: free disk space is below the configured minimum. {} source(s) not attempted.",
            report.remaining
        );
    } else if report.cancelled {
        println!();
        println!("Cancelled: {} source(s) not attempted.", report.remaining);
    }
}
