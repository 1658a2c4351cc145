use std::sync::Arc;

use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chainwatch_notifier::chat::registry::ChatRegistry;
use chainwatch_notifier::config::Config;
use chainwatch_notifier::frontend::telegram::{run_updates, TelegramGateway};
use chainwatch_notifier::frontend::CommandRouter;
use chainwatch_notifier::monitor::source::RpcTransactionSource;
use chainwatch_notifier::monitor::TransactionMonitor;
use chainwatch_notifier::payment::attributor::PaymentAttributor;
use chainwatch_notifier::payment::references::ReferenceTable;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();

    // Initialize structured logging (set RUST_LOG=debug for per-transaction output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ChainWatch Notifier starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    let monitor_settings = config.monitor_settings()?;
    tracing::info!(
        operator_wallet = %monitor_settings.operator_wallet,
        "Configuration loaded from {}",
        config_path
    );

    let bot = Bot::new(config.bot_token()?);
    let telegram = Arc::new(TelegramGateway::new(bot.clone()));

    let source = RpcTransactionSource::connect(&config.rpc.ws_url).await?;

    // Shared state: chat configs, trending set, payment references
    let registry = Arc::new(ChatRegistry::new());
    let references = Arc::new(ReferenceTable::new());

    let attributor = Arc::new(PaymentAttributor::new(
        config.payment_settings(),
        references.clone(),
        registry.clone(),
        telegram.clone(),
    ));

    let monitor = Arc::new(TransactionMonitor::new(
        Arc::new(source),
        registry.clone(),
        attributor,
        telegram.clone(),
        monitor_settings.clone(),
    ));

    let router = Arc::new(CommandRouter::new(
        registry,
        references,
        telegram,
        monitor_settings.operator_wallet,
        config.payment_settings(),
    ));

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    let monitor_handle = tokio::spawn(monitor.run_until_cancelled(shutdown.clone()));
    let updates_handle = tokio::spawn(run_updates(bot, router, shutdown.clone()));

    tracing::info!("Monitor and bot started. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");
    shutdown.cancel();

    let _ = monitor_handle.await;
    let _ = updates_handle.await;

    tracing::info!("ChainWatch Notifier stopped gracefully");
    Ok(())
}
