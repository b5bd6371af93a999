use crate::cli::Args;
use crate::config::Config;
use crate::error::AppError;
use std::io::stdout;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILE_NAME: &str = "gridiron_export.log";
const DEFAULT_DIRECTIVE: &str = "gridiron_export=info";

fn env_filter() -> Result<EnvFilter, AppError> {
    let directive = DEFAULT_DIRECTIVE
        .parse()
        .map_err(|e| AppError::log_setup_error(format!("Invalid log directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Splits the configured log location into directory and file name.
fn resolve_log_location(args: &Args, config: &Config) -> (String, String) {
    let custom_log_path = args.log_file.as_ref().or(config.log_file_path.as_ref());
    match custom_log_path {
        Some(custom_path) => {
            let path = Path::new(custom_path);
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_LOG_FILE_NAME);
            (parent.to_string_lossy().to_string(), file_name.to_string())
        }
        None => (
            Config::get_log_dir_path(),
            DEFAULT_LOG_FILE_NAME.to_string(),
        ),
    }
}

/// Sets up logging for the process.
///
/// - Always logs to a daily rolling file in the configured location
/// - Also logs to stdout unless `--quiet` is given
/// - Creates the log directory if it doesn't exist
///
/// Returns the path to the log file and the guard that must be kept alive
/// for the duration of the program to ensure proper log flushing.
pub async fn setup_logging(args: &Args, config: &Config) -> Result<(String, WorkerGuard), AppError> {
    let (log_dir, log_file_name) = resolve_log_location(args, config);

    if !Path::new(&log_dir).exists() {
        tokio::fs::create_dir_all(&log_dir).await.map_err(|e| {
            AppError::log_setup_error(format!("Failed to create log directory: {e}"))
        })?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, &log_file_name);
    // The guard flushes buffered lines when dropped.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(env_filter()?);
    let registry = tracing_subscriber::registry().with(file_layer);

    let init_result = if args.quiet {
        registry.try_init()
    } else {
        registry
            .with(
                fmt::Layer::new()
                    .with_writer(stdout)
                    .with_ansi(true)
                    .with_filter(env_filter()?),
            )
            .try_init()
    };
    init_result.map_err(|e| AppError::log_setup_error(e.to_string()))?;

    let log_file_path = format!("{log_dir}/{log_file_name}");
    Ok((log_file_path, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_log_location_prefers_cli_flag() {
        let args = Args::parse_from(["gridiron_export", "--log-file", "/tmp/x/run.log", "list-config"]);
        let config = Config {
            log_file_path: Some("/var/log/other.log".to_string()),
            ..Config::default()
        };
        let (dir, file) = resolve_log_location(&args, &config);
        assert_eq!(dir, "/tmp/x");
        assert_eq!(file, "run.log");
    }

    #[test]
    fn test_log_location_falls_back_to_config_then_default() {
        let args = Args::parse_from(["gridiron_export", "list-config"]);
        let config = Config {
            log_file_path: Some("/var/log/other.log".to_string()),
            ..Config::default()
        };
        assert_eq!(
            resolve_log_location(&args, &config),
            ("/var/log".to_string(), "other.log".to_string())
        );

        let (dir, file) = resolve_log_location(&args, &Config::default());
        assert!(dir.ends_with("logs"));
        assert_eq!(file, DEFAULT_LOG_FILE_NAME);
    }

    #[test]
    fn test_default_directive_parses() {
        assert!(env_filter().is_ok());
    }
}
