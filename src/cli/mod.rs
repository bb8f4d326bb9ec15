pub mod ask;
pub mod doctor;
pub mod forget;
pub mod ingest;
pub mod search;
pub mod stats;

use indicatif::{ProgressBar, ProgressStyle};

/// Bar for batch ingestion, one tick per finished source.
pub(crate) fn ingest_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .expect("valid template")
            .progress_chars("##-"),
    );
    pb
}

/// Cut `text` to at most `max` characters, marking the cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
