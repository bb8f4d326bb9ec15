use anyhow::Result;

use resonant::engine::Engine;

/// Display index statistics in the terminal.
pub async fn stats(engine: &Engine) -> Result<()> {
    let stats = engine.stats().await?;
    let db_path = engine.config().resolved_db_path();
    let db_size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    println!("Index Statistics");
    println!("{}", "=".repeat(40));
    println!("  Sources:             {}", stats.total_sources);
    println!("  Words:               {}", stats.total_words);
    println!("  Average frequency:   {:.2}", stats.avg_frequency);
    println!();
    println!("Database:              {}", db_path.display());
    println!("Database size:         {db_size_bytes} bytes");

    Ok(())
}
