// src/main.rs
use clap::Parser;
use gridiron_export::cli::Args;
use gridiron_export::commands::{self, CommandContext};
use gridiron_export::config::Config;
use gridiron_export::error::AppError;
use gridiron_export::logging::setup_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let config = Config::load().await?;

    // The guard must be kept alive for the duration of the program
    // to ensure logs are flushed properly
    let (log_file_path, _guard) = setup_logging(&args, &config).await?;
    info!(
        "{} {} starting, logging to {}",
        gridiron_export::NAME,
        gridiron_export::VERSION,
        log_file_path
    );

    let context = CommandContext::from_config(config)?;
    if let Err(e) = commands::run(&context, args.command).await {
        error!("Command failed: {}", e);
        if let Some(raw) = e.raw_response() {
            error!("Raw upstream response: {}", raw);
        }
        return Err(e);
    }
    Ok(())
}
