use anyhow::Result;

use resonant::engine::Engine;
use resonant::signature::CategoryTag;

/// Run a resonance search from the terminal.
pub async fn search(
    engine: &Engine,
    query: &str,
    top_n: usize,
    min_similarity: f64,
    json: bool,
) -> Result<()> {
    let hits = engine.search(query, top_n, min_similarity).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No resonant sources found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} (score: {:.4})",
            i + 1,
            super::preview(&hit.url, 100),
            hit.score
        );
        println!(
            "     {} | {:.2} Hz | {} words",
            hit.category_tag, hit.primary_frequency, hit.word_count
        );
        println!();
    }

    Ok(())
}

/// List URLs inside a frequency band.
pub async fn range(
    engine: &Engine,
    min_freq: f64,
    max_freq: f64,
    category: Option<&str>,
    limit: usize,
) -> Result<()> {
    let category = category
        .map(str::parse::<CategoryTag>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let urls = engine
        .frequency_range(min_freq, max_freq, category, limit)
        .await?;

    if urls.is_empty() {
        println!("No sources between {min_freq:.2} and {max_freq:.2} Hz.");
        return Ok(());
    }
    for url in urls {
        println!("{url}");
    }
    Ok(())
}
