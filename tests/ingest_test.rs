mod helpers;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use helpers::{FakeFetcher, FakePage, FixedProbe};
use resonant::ingest::{
    BatchOptions, FailureReason, IngestOutcome, ProgressFn, SkipReason, Source,
};
use tokio_util::sync::CancellationToken;

fn plenty() -> Arc<FixedProbe> {
    Arc::new(FixedProbe::new(u64::MAX))
}

fn options(max_concurrency: usize, delay: Duration) -> BatchOptions {
    BatchOptions {
        max_concurrency,
        delay,
        force_reload: false,
    }
}

/// Serve `n` distinct articles and return their sources.
fn serve_many(fetcher: &FakeFetcher, n: usize) -> Vec<Source> {
    (0..n)
        .map(|i| {
            let url = format!("https://site.example/article/{i}");
            fetcher.serve_text(&url, helpers::long_text("astronomy", i));
            helpers::source(&url)
        })
        .collect()
}

#[tokio::test]
async fn second_ingest_is_skipped_without_fetching() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve_text("https://a.example/", helpers::long_text("music", 1));
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), store.clone());
    let src = helpers::source("https://a.example/");

    let first = manager.ingest_source(&src, false).await;
    assert!(matches!(first, IngestOutcome::Indexed { created: true, .. }));

    let second = manager.ingest_source(&src, false).await;
    assert_eq!(
        second,
        IngestOutcome::Skipped {
            reason: SkipReason::AlreadyIndexed
        }
    );
    assert_eq!(fetcher.calls("https://a.example/"), 1);
    assert_eq!(store.stats().await.unwrap().total_sources, 1);
}

#[tokio::test]
async fn force_reload_refetches_and_overwrites() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve_text("https://a.example/", helpers::long_text("music", 1));
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), store.clone());
    let src = helpers::source("https://a.example/");

    manager.ingest_source(&src, false).await;
    fetcher.serve_text("https://a.example/", helpers::long_text("music", 2));
    let again = manager.ingest_source(&src, true).await;

    assert!(matches!(again, IngestOutcome::Indexed { created: false, .. }));
    assert_eq!(fetcher.calls("https://a.example/"), 2);
    assert_eq!(store.stats().await.unwrap().total_sources, 1);
}

#[tokio::test]
async fn identical_content_under_new_url_is_a_duplicate() {
    let fetcher = Arc::new(FakeFetcher::new());
    let text = helpers::long_text("gardening", 7);
    fetcher.serve_text("https://one.example/", text.clone());
    fetcher.serve_text("https://mirror.example/", text);
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), store.clone());

    manager
        .ingest_source(&helpers::source("https://one.example/"), false)
        .await;
    let dup = manager
        .ingest_source(&helpers::source("https://mirror.example/"), false)
        .await;

    assert_eq!(
        dup,
        IngestOutcome::Skipped {
            reason: SkipReason::DuplicateContent {
                existing_url: "https://one.example/".into()
            }
        }
    );
    assert!(!store.exists("https://mirror.example/").await.unwrap());
    assert_eq!(store.stats().await.unwrap().total_sources, 1);
}

#[tokio::test]
async fn short_and_failing_pages_are_reported_per_source() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve("https://short.example/", FakePage::Short);
    fetcher.serve("https://down.example/", FakePage::Status(503));
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), helpers::test_store());

    let short = manager
        .ingest_source(&helpers::source("https://short.example/"), false)
        .await;
    assert_eq!(
        short,
        IngestOutcome::Skipped {
            reason: SkipReason::ContentTooShort
        }
    );

    let down = manager
        .ingest_source(&helpers::source("https://down.example/"), false)
        .await;
    match down {
        IngestOutcome::Failed {
            reason: FailureReason::Fetch { kind, message },
        } => {
            assert_eq!(kind, "http_status");
            assert!(message.contains("503"));
        }
        other => panic!("expected fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn skips_and_failures_are_written_to_the_ingest_log() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve("https://short.example/", FakePage::Short);
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), store.clone());

    manager
        .ingest_source(&helpers::source("https://short.example/"), false)
        .await;
    manager
        .ingest_source(&helpers::source("https://missing.example/"), false)
        .await;

    assert_eq!(store.health().await.unwrap().log_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_respects_concurrency_and_politeness_delay() {
    let fetcher = Arc::new(FakeFetcher::with_latency(Duration::from_millis(5)));
    let sources = serve_many(&fetcher, 50);
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), store.clone());

    let started = Instant::now();
    let report = manager
        .ingest_batch(
            sources,
            options(3, Duration::from_millis(100)),
            CancellationToken::new(),
            None,
        )
        .await;
    let elapsed = started.elapsed();

    assert_eq!(report.processed, 50);
    assert_eq!(report.successful, 50);
    assert_eq!(report.failed, 0);
    assert!(!report.paused);
    assert_eq!(report.remaining, 0);
    assert!(fetcher.peak_in_flight() <= 3);
    // 50 delays of 100ms shared by 3 workers
    assert!(elapsed >= Duration::from_millis(1600), "took {elapsed:?}");
    assert_eq!(store.stats().await.unwrap().total_sources, 50);
}

#[tokio::test]
async fn batch_counts_each_outcome() {
    let fetcher = Arc::new(FakeFetcher::new());
    let mut sources = serve_many(&fetcher, 3);
    fetcher.serve("https://short.example/", FakePage::Short);
    sources.push(helpers::source("https://short.example/"));
    sources.push(helpers::source("https://gone.example/"));
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), helpers::test_store());

    let report = manager
        .ingest_batch(
            sources,
            options(2, Duration::ZERO),
            CancellationToken::new(),
            None,
        )
        .await;

    assert_eq!(report.processed, 5);
    assert_eq!(report.successful, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn batch_runs_lower_priority_first_and_drops_repeated_urls() {
    let fetcher = Arc::new(FakeFetcher::new());
    for (i, url) in ["https://c.example/", "https://a.example/", "https://b.example/"]
        .iter()
        .enumerate()
    {
        fetcher.serve_text(url, helpers::long_text("cooking", i));
    }
    let sources = vec![
        Source::new("https://c.example/", "c").with_priority(9),
        Source::new("https://a.example/", "a").with_priority(1),
        Source::new("https://b.example/", "b").with_priority(5),
        Source::new("https://a.example/", "a again").with_priority(1),
    ];
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), helpers::test_store());

    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let progress: ProgressFn = Arc::new(move |source: &Source, _outcome: &IngestOutcome| {
        seen.lock().unwrap().push(source.name.clone());
    });

    let report = manager
        .ingest_batch(
            sources,
            options(1, Duration::ZERO),
            CancellationToken::new(),
            Some(progress),
        )
        .await;

    assert_eq!(report.processed, 3);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(fetcher.calls("https://a.example/"), 1);
}

#[tokio::test]
async fn batch_pauses_before_fetching_when_storage_is_low() {
    let fetcher = Arc::new(FakeFetcher::new());
    let sources = serve_many(&fetcher, 4);
    let probe = Arc::new(FixedProbe::new(10));
    let store = helpers::test_store();
    let manager = helpers::test_manager(Arc::clone(&fetcher), probe, store.clone());

    let report = manager
        .ingest_batch(
            sources,
            options(2, Duration::ZERO),
            CancellationToken::new(),
            None,
        )
        .await;

    assert!(report.paused);
    assert_eq!(report.processed, 0);
    assert_eq!(report.remaining, 4);
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(store.stats().await.unwrap().total_sources, 0);
}

#[tokio::test]
async fn batch_pauses_mid_run_and_keeps_the_rest_queued() {
    let fetcher = Arc::new(FakeFetcher::new());
    let sources = serve_many(&fetcher, 5);
    let probe = Arc::new(FixedProbe::new(u64::MAX));
    let manager =
        helpers::test_manager(Arc::clone(&fetcher), Arc::clone(&probe), helpers::test_store());

    let low = Arc::clone(&probe);
    let progress: ProgressFn = Arc::new(move |_source: &Source, _outcome: &IngestOutcome| {
        low.set(0);
    });

    let report = manager
        .ingest_batch(
            sources,
            options(1, Duration::ZERO),
            CancellationToken::new(),
            Some(progress),
        )
        .await;

    assert!(report.paused);
    assert_eq!(report.processed, 1);
    assert_eq!(report.successful, 1);
    assert_eq!(report.remaining, 4);
}

#[tokio::test]
async fn cancelled_token_stops_batch_before_any_work() {
    let fetcher = Arc::new(FakeFetcher::new());
    let sources = serve_many(&fetcher, 3);
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), helpers::test_store());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = manager
        .ingest_batch(sources, options(3, Duration::ZERO), cancel, None)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert_eq!(report.remaining, 3);
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn cancellation_interrupts_the_politeness_delay() {
    let fetcher = Arc::new(FakeFetcher::new());
    let sources = serve_many(&fetcher, 4);
    let manager = helpers::test_manager(Arc::clone(&fetcher), plenty(), helpers::test_store());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress: ProgressFn = Arc::new(move |_source: &Source, _outcome: &IngestOutcome| {
        trigger.cancel();
    });

    let started = Instant::now();
    let report = manager
        .ingest_batch(
            sources,
            options(1, Duration::from_secs(30)),
            cancel,
            Some(progress),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.cancelled);
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 3);
}
