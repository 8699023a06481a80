use anyhow::Result;
use tokenwatch::{
    db::{get_db_pool, migrations, DatabaseConfig, SqliteStore},
    services::{ExplorerClient, TelegramNotifier},
    utils::{config::Config, init_logging},
    watcher::{TransferWatcher, WatcherSettings},
};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("🎯 Starting transfer watch loop...");

    // Load config and connect to database
    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    migrations::run_migrations(&pool).await?;

    info!(
        "⚙️ Poll every {}s | up to {} events/query | ledger cap {} | send cap {}/{}s | direction {:?} | fan-out {}",
        config.poll_interval_seconds,
        config.max_events_per_query,
        config.notified_set_cap,
        config.rate_limit_count,
        config.rate_limit_window_seconds,
        config.direction_filter,
        config.max_in_flight_requests
    );

    let request_timeout = Duration::from_secs(config.request_timeout_seconds);
    let explorer = ExplorerClient::new(
        config.explorer_api_url.clone(),
        config.explorer_api_key.clone(),
        request_timeout,
    )?;
    let notifier = TelegramNotifier::new(config.telegram_bot_token.clone(), request_timeout)?;
    let store = SqliteStore::new(pool);
    let settings = WatcherSettings::from_config(&config);

    // Ctrl-C finishes the in-flight cycle (ledger write-back included)
    // before the loop exits
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("🛑 Shutdown signal received, finishing current cycle...");
        signal_token.cancel();
    });

    let mut watcher = TransferWatcher::load(store, explorer, notifier, settings).await?;
    watcher.run(shutdown).await?;

    Ok(())
}
