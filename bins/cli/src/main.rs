//! fotos image storage CLI
//!
//! Exposes every image storage operation as a subcommand, against the
//! backend selected by configuration.

mod cli;

use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, guess_content_type};
use fotos_core::storage::{ImageStorageAdapter, ImageStorageService, StorageConfig};
use fotos_shared::{AppConfig, AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "fotos=debug" } else { "fotos=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().map_err(AppError::from)?;
    let storage_config = StorageConfig::try_from(&config.storage).map_err(AppError::from)?;
    let storage = ImageStorageAdapter::new(storage_config).map_err(AppError::from)?;
    let verified = storage.verify_bucket().await;

    run(&storage, verified, cli.command).await?;

    Ok(())
}

async fn run(storage: &ImageStorageAdapter, verified: bool, command: Commands) -> AppResult<()> {
    match command {
        Commands::Check => print!("{}", check_summary(storage, verified)),
        Commands::Upload {
            file,
            path,
            content_type,
        } => {
            let data = tokio::fs::read(&file).await.map_err(|e| {
                AppError::Validation(format!("cannot read {}: {e}", file.display()))
            })?;
            let content_type =
                content_type.unwrap_or_else(|| guess_content_type(&file).to_string());

            let stored = storage
                .upload(Bytes::from(data), &path, &content_type)
                .await?;
            println!("{stored}");
        }
        Commands::ReadUrl { path, minutes } => {
            let url = storage
                .generate_read_url(&path, minutes_to_duration(minutes))
                .await?;
            println!("{url}");
        }
        Commands::UploadUrl {
            path,
            content_type,
            minutes,
        } => {
            let url = storage
                .generate_upload_url(&path, &content_type, minutes_to_duration(minutes))
                .await?;
            println!("{url}");
        }
        Commands::Download { path, output } => {
            let data = storage
                .download(&path)
                .await
                .ok_or_else(|| AppError::NotFound(path.clone()))?;

            match output {
                Some(file) => {
                    tokio::fs::write(&file, &data).await.map_err(|e| {
                        AppError::Internal(format!("cannot write {}: {e}", file.display()))
                    })?;
                    info!(path = %path, file = %file.display(), size = data.len(), "Saved object");
                }
                None => std::io::stdout()
                    .write_all(&data)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            }
        }
        Commands::Delete { path } => {
            println!("{}", storage.delete(&path).await);
        }
        Commands::Exists { path } => {
            println!("{}", storage.exists(&path).await?);
        }
    }

    Ok(())
}

/// Report for `check`, using the verification done at start-up.
fn check_summary(storage: &ImageStorageAdapter, verified: bool) -> String {
    format!(
        "provider:  {}\nbucket:    {}\nbase path: {}\nverified:  {verified}\n",
        storage.provider_name(),
        storage.bucket(),
        storage.base_path(),
    )
}

fn minutes_to_duration(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}
