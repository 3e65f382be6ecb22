//! langreport CLI entry point.

use langreport::api::{ApiState, QueryCursor};
use langreport::bot::Bot;
use langreport::config::Config;
use langreport::db::Db;
use langreport::messaging::{Messaging as _, SlackAdapter};
use langreport::responses::ResponseStore;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "langreport")]
#[command(about = "Slack bot that collects language reports, plus a read-only API over them")]
struct Cli {
    /// Env file to load instead of `./.env`
    #[arg(short, long, global = true)]
    env_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Slack bot (Socket Mode)
    Bot,
    /// Serve the HTTP query API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_env_file(cli.env_file.as_deref())
        .context("failed to load configuration")?;

    let process_name = match cli.command {
        Command::Bot => "bot",
        Command::Serve => "serve",
    };
    let _log_guard = match &config.log_dir {
        Some(log_dir) => Some(langreport::logging::init_file_tracing(
            log_dir,
            &format!("langreport-{process_name}.log"),
            cli.debug,
        )),
        None => {
            langreport::logging::init_foreground_tracing(cli.debug);
            None
        }
    };

    config
        .ensure_data_dir()
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let db = Db::connect(&config.database)
        .await
        .context("failed to open database")?;
    db.ensure_schema()
        .await
        .context("failed to create database schema")?;
    tracing::info!(path = %config.database.sqlite_path().display(), "database ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for shutdown signal");
            // Keep the sender alive: dropping it would read as a shutdown.
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let result = match cli.command {
        Command::Bot => run_bot(&config, db.clone(), shutdown_rx).await,
        Command::Serve => run_server(&config, db.clone(), shutdown_rx).await,
    };

    db.close().await;
    tracing::info!("langreport stopped");
    result
}

async fn run_bot(config: &Config, db: Db, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    let slack_config = config.require_slack()?;

    // slack-morphism's hyper connector needs a process-wide rustls provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let messaging = Arc::new(SlackAdapter::new(slack_config)?);
    messaging
        .health_check()
        .await
        .context("slack API is unreachable")?;
    let bot = Bot::new(messaging.clone(), db)
        .await
        .context("failed to initialize bot")?;
    tracing::info!(bot_user_id = bot.bot_user_id(), "bot identity resolved");

    let events = messaging
        .start()
        .await
        .context("failed to start slack adapter")?;

    bot.bootstrap(config.welcome_on_start).await;
    bot.run(events, shutdown_rx).await;

    messaging.shutdown().await?;
    Ok(())
}

async fn run_server(
    config: &Config,
    db: Db,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let cursor = QueryCursor::new(&config.api.cursor_path);
    cursor
        .ensure_exists()
        .await
        .with_context(|| format!("failed to create cursor file {}", cursor.path().display()))?;

    let state = Arc::new(ApiState::new(ResponseStore::new(db), cursor));
    let handle = langreport::api::start_http_server(config.api.bind, state, shutdown_rx).await?;
    handle.await.context("HTTP server task panicked")?;
    Ok(())
}
