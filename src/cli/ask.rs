use anyhow::Result;

use resonant::answer::QueryContext;
use resonant::engine::Engine;

pub async fn ask(engine: &Engine, query: &str, json: bool) -> Result<()> {
    let answer = engine.answer(query, &QueryContext::default()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", answer.answer);
        println!();
        println!("[source: {}, confidence: {:.2}]", answer.source, answer.confidence);
    }
    Ok(())
}
