//! # Main Entry Point
//!
//! Initializes the bot:
//! - Domain: configuration, catalog model, transport contract
//! - Infrastructure: Matrix client, index fetcher, SQLite state store
//! - Application: diff engine, formatter, liveness monitor, driver

#![recursion_limit = "256"]

mod application;
mod domain;
mod infrastructure;

use anyhow::{bail, Context, Result};
use clap::Parser;
use matrix_sdk::config::SyncSettings;
use matrix_sdk::ruma::OwnedRoomId;
use matrix_sdk::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::liveness::LivenessMonitor;
use crate::application::scheduler::Driver;
use crate::domain::config::AppConfig;
use crate::infrastructure::fetch::Fetcher;
use crate::infrastructure::matrix::MatrixTransport;
use crate::infrastructure::store::Store;

/// Announces additions and version bumps from F-Droid style repos into a
/// Matrix room.
#[derive(Parser, Debug)]
#[command(name = "fdroid-herald", version)]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: PathBuf,

    /// Optionally pass a file that only contains the password for the
    /// Matrix account
    #[arg(short, long)]
    password_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    // Logging: everything to a file, info and up to stdout.
    let file_appender = tracing_appender::rolling::never(".", "fdroid-herald.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "info,matrix_sdk=warn,matrix_sdk_base=warn,matrix_sdk_crypto=error,ruma=warn,hyper=warn",
        )
    });

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    tracing::info!("Starting fdroid-herald...");

    if config.feeds.is_empty() {
        bail!("No feeds configured");
    }
    let password = resolve_password(&config, args.password_file.as_deref())?;

    let store = Arc::new(Store::open(Path::new(&config.database))?);
    let fetcher = Arc::new(Fetcher::new()?);

    // Matrix setup.
    let client = Client::builder()
        .homeserver_url(&config.matrix.homeserver)
        .build()
        .await?;

    client
        .matrix_auth()
        .login_username(&config.matrix.username, &password)
        .send()
        .await?;

    tracing::info!("Logged in as {}", config.matrix.username);

    let room_id: OwnedRoomId = config
        .matrix
        .room
        .as_str()
        .try_into()
        .context("Invalid room id in config")?;
    client
        .join_room_by_id(&room_id)
        .await
        .context("Failed to join announcement room")?;

    let transport = Arc::new(MatrixTransport::new(
        client.clone(),
        room_id,
        config.matrix.nickname.clone(),
    ));
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    transport.install_handlers(inbound_tx);

    let monitor = Arc::new(LivenessMonitor::new(
        transport.clone(),
        Duration::from_secs(config.intervals.probe_grace),
    ));

    // Seed feeds this bot has never seen before, then start the workers.
    let driver = Driver::new(config.clone(), store, fetcher, transport, monitor);
    driver
        .initialize()
        .await
        .context("Failed to initialize feed state")?;
    let worker_handles = driver.spawn(inbound_rx);

    let sync_client = client.clone();
    let sync_handle = tokio::spawn(async move { sync_client.sync(SyncSettings::default()).await });

    // The sync loop keeps the process alive; the workers die with it.
    match sync_handle.await {
        Ok(Ok(())) => tracing::warn!("Matrix sync loop ended"),
        Ok(Err(e)) => tracing::error!("Matrix sync failed: {}", e),
        Err(e) => tracing::error!("Matrix sync task panicked: {}", e),
    }
    for handle in worker_handles {
        handle.abort();
    }

    Ok(())
}

/// The config password wins; the password file is the fallback. Having
/// neither is a startup error.
fn resolve_password(config: &AppConfig, password_file: Option<&Path>) -> Result<String> {
    if !config.matrix.password.is_empty() {
        return Ok(config.matrix.password.clone());
    }
    if let Some(path) = password_file {
        let password = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read password file {}", path.display()))?;
        let password = password.trim_end_matches(['\r', '\n']).to_string();
        if !password.is_empty() {
            return Ok(password);
        }
    }
    bail!("Please provide the Matrix password either via config or password file")
}
