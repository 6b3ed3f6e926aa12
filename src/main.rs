use clap::{Parser, Subcommand};
use poller::{PollSettings, PollingService};
use postwatch_core::{AppConfig, ConfigError, CoreError, ErrorExt, HANDLE_ENV_VAR};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use store::RecordStore;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use twitter_client::{ClientConfig, TwitterClient};

#[derive(Parser)]
#[command(
    name = "postwatch",
    version,
    about = "Follow a Twitter account through the guest API and keep its posts on disk"
)]
struct Cli {
    /// TOML config file; flags and environment override its values
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Account to follow, with or without the leading @
    #[arg(long, global = true, env = HANDLE_ENV_VAR)]
    user: Option<String>,

    /// Append-only record file
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the account and append new posts to the store (default)
    Follow,
    /// Serve the store as JSON on GET /
    Serve {
        #[arg(long, help = "Listen address, e.g. 127.0.0.1:8080")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,postwatch=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.log_error();
            error!("Exiting with {}: {}", e.error_code(), e.user_friendly_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = AppConfig::load(cli.config.as_deref())?
        .with_handle(cli.user)
        .with_store_path(cli.store);
    let store = RecordStore::new(config.store_path.clone());

    match cli.command.unwrap_or(Command::Follow) {
        Command::Follow => follow(&config, store).await,
        Command::Serve { bind } => {
            let raw = bind.unwrap_or_else(|| config.bind_addr.clone());
            let addr: SocketAddr = raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "bind_addr".to_string(),
                value: raw.clone(),
            })?;
            reader::serve(store, addr).await
        }
    }
}

async fn follow(config: &AppConfig, store: RecordStore) -> Result<(), CoreError> {
    let settings = PollSettings::from_app_config(config)?;
    info!(
        "Starting postwatch for @{} (store: {})",
        settings.handle,
        store.path().display()
    );

    let client = TwitterClient::new(ClientConfig::from_app_config(config)?)?;
    let mut service = PollingService::new(client, store, settings);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received, finishing up (press again to quit immediately)");
        let _ = stop_tx.send(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second Ctrl-C, exiting without cleanup");
            std::process::exit(130);
        }
    });

    let result = service.run(stop_rx).await;
    info!("{}", service.source().stats().await.summary());
    result
}
