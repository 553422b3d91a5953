//! Feed dashboard: binary entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use flux_dashboard::{
    api,
    config::{
        ai::{AiConfig, DEFAULT_AI_CONFIG_PATH},
        app::AppConfig,
    },
    init_tracing,
    metrics::Metrics,
    AppState,
};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load_default()?;
    let ai_cfg = AiConfig::load_or_disabled(DEFAULT_AI_CONFIG_PATH);
    tracing::info!(
        sources = %cfg.sources_path.display(),
        timeout_secs = cfg.fetch_timeout_secs,
        max_redirects = cfg.fetch_max_redirects,
        ai_enabled = ai_cfg.enabled,
        ai_provider = %ai_cfg.provider,
        "starting feed dashboard"
    );

    let state = AppState::from_config(&cfg, &ai_cfg)?;
    let metrics = Metrics::init()?;

    let router = api::app_router(state, &cfg.static_dir).merge(metrics.router());

    Ok(router.into())
}
