//! MCP server initialization over stdio.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

use crate::tools::ResonantTools;
use resonant::config::ResonantConfig;
use resonant::engine::Engine;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: ResonantConfig) -> Result<()> {
    tracing::info!("starting Resonant MCP server on stdio");

    let engine = Arc::new(Engine::open(config)?);

    let tools = ResonantTools::new(Arc::clone(&engine));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    // the tool handler is dropped with the service, so this is the last handle
    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.close().await?,
        Err(_) => tracing::warn!("engine still shared at shutdown, skipping checkpoint"),
    }

    Ok(())
}
