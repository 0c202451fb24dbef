//! Process bootstrap: configuration, logging, the user store, the Mini
//! App API server and the Telegram dispatcher.

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::time::sleep;

use foxcore::config::{self, Config};
use foxcore::core::logging::{init_logger, log_startup_configuration};
use foxcore::storage::db;

use foxfury::cli::{Cli, Commands};
use foxfury::telegram::{create_bot, schema, setup_bot_commands, run_webapp_server, HandlerDeps, WebAppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    // Load .env before reading any configuration
    let _ = dotenv();
    let app_config = Config::from_env();

    init_logger(&app_config.log_file_path)?;
    log_startup_configuration(&app_config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Migrate => run_migrate(&app_config),
        Commands::Run => run_bot(app_config).await,
    }
}

/// Bring the database schema up to date and exit.
fn run_migrate(config: &Config) -> anyhow::Result<()> {
    db::create_pool(&config.database_path)?;
    log::info!("Database schema is up to date: {}", config.database_path);
    Ok(())
}

/// Run the Mini App API and the long-polling dispatcher until shutdown.
async fn run_bot(config: Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.bot_token.is_empty(),
        "BOT_TOKEN (or TELOXIDE_TOKEN) must be set to start polling"
    );

    let config = Arc::new(config);
    let db_pool = Arc::new(db::create_pool(&config.database_path)?);

    // Mini App API runs beside the polling loop in the same runtime.
    let api_state = WebAppState {
        db_pool: Arc::clone(&db_pool),
        config: Arc::clone(&config),
    };
    let api_host = config.api_host.clone();
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = run_webapp_server(&api_host, api_port, api_state).await {
            log::error!("Mini App API server exited: {}", e);
        }
    });

    let bot = create_bot(&config)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let handler = schema(HandlerDeps::new(Arc::clone(&db_pool), Arc::clone(&config)));

    log::info!("Starting bot in long polling mode");
    log::info!("📡 Ready to receive updates!");

    // Run the dispatcher with retry logic
    let mut retry_count: u32 = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Create the dispatcher in a separate task to isolate panics;
        // "TX is dead" panics are caught via the JoinHandle.
        let handle = tokio::spawn(async move {
            use teloxide::prelude::*;
            use teloxide::update_listeners::Polling;

            // Drop pending updates on start
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);

                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    anyhow::bail!("dispatcher kept panicking after {} retries", retry_count);
                }
                retry_count += 1;
                log::info!(
                    "Retrying dispatcher connection after panic (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }

        // Extra delay between retries to avoid hammering the API
        sleep(config::retry::dispatcher_delay()).await;
    }

    Ok(())
}

async fn exponential_backoff(attempt: u32) {
    let secs = config::retry::EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt);
    sleep(Duration::from_secs(secs)).await;
}
