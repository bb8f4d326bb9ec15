//! Frequency-indexed knowledge retrieval.
//!
//! Resonant fetches web content, encodes each page into a deterministic
//! [`Signature`](signature::Signature) (a primary frequency, a category tag and
//! a golden-ratio harmonic ladder with derived pattern metrics), stores the
//! signatures in SQLite, and answers free-text queries by ranking stored
//! signatures against the query's own signature behind a cached fallback chain.
//!
//! # Pipeline
//!
//! | Stage | Module | Entry point |
//! |-------|--------|-------------|
//! | Fetch (SSRF-guarded) | [`fetch`] | [`fetch::ContentFetcher::fetch`] |
//! | Encode | [`signature`] | [`signature::SignatureEncoder::encode`] |
//! | Store | [`index`] | [`index::IndexStore::upsert`] |
//! | Ingest batches | [`ingest`] | [`ingest::IngestionManager::ingest_batch`] |
//! | Retrieve | [`retrieval`] | [`retrieval::RetrievalAgent::find_resonant`] |
//! | Answer | [`answer`] | [`answer::Orchestrator::answer`] |
//!
//! [`engine::Engine`] owns one of each and is what the CLI and the MCP server use.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`error`] — Typed error kinds for each stage

pub mod answer;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod index;
pub mod ingest;
pub mod retrieval;
pub mod signature;
