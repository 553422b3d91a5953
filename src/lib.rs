// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai_adapter;
pub mod ai_command;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod sources;

pub use crate::api::{router, AppState};
pub use crate::ingest::{aggregate, types::Article, Aggregation};
pub use crate::sources::{Source, SourceRegistry};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact fmt subscriber filtered by `RUST_LOG`
/// (default `flux_dashboard=info,warn`). No-op if one is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flux_dashboard=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
