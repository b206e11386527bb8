pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Process entry point: configure, start the queue worker, serve HTTP until
/// Ctrl-C.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env()?;
    // The blocking model client must be built outside the async runtime.
    let (core, _secret) = core_state::CoreState::from_config(&app_config)?;
    let core = Arc::new(core);
    tracing::info!(db = %core.db_path().display(), "Database ready");

    let worker = app_config
        .poll_interval
        .map(|interval| pipeline::queue::start_queue_worker(core.clone(), interval));
    if worker.is_none() {
        tracing::info!("Queue worker disabled");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(api::serve(core, app_config.bind_addr, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown requested");
    }))?;

    // Joins the worker thread.
    drop(worker);
    Ok(())
}
