use anyhow::Result;

use resonant::engine::Engine;

pub async fn forget(engine: &Engine, url: &str) -> Result<()> {
    if engine.forget(url).await? {
        println!("Removed {url} from the index.");
    } else {
        println!("{url} is not indexed.");
    }
    Ok(())
}
