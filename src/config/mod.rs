use crate::constants::{env_vars, export, upstream};
use crate::error::AppError;
use crate::export::scheduler::ExportSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_data_dir_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the application.
/// Handles loading, saving, and managing application settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the upstream gateway (login, process and export endpoints).
    #[serde(default = "default_blaze_base_url")]
    pub blaze_base_url: String,
    /// OAuth token endpoint used for refresh and authorization-code grants.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Directory holding one JSON document per connected league.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// HTTP timeout in seconds for upstream and destination requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Upper bound of the random delay before each weekly fetch, in milliseconds.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
    /// Team rosters fetched concurrently per group.
    #[serde(default = "default_roster_batch_size")]
    pub roster_batch_size: usize,
    /// Interval between automatic exports in watch mode.
    #[serde(default = "default_auto_export_interval")]
    pub auto_export_interval_minutes: u64,
}

fn default_blaze_base_url() -> String {
    upstream::DEFAULT_BLAZE_BASE_URL.to_string()
}

fn default_token_url() -> String {
    upstream::DEFAULT_TOKEN_URL.to_string()
}

/// Default HTTP timeout in seconds
fn default_http_timeout() -> u64 {
    crate::constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_jitter_max_ms() -> u64 {
    export::DEFAULT_JITTER_MAX_MS
}

fn default_roster_batch_size() -> usize {
    export::DEFAULT_ROSTER_BATCH_SIZE
}

fn default_auto_export_interval() -> u64 {
    export::DEFAULT_AUTO_EXPORT_INTERVAL_MINUTES
}

impl Default for Config {
    fn default() -> Self {
        Config {
            blaze_base_url: default_blaze_base_url(),
            token_url: default_token_url(),
            data_dir: None,
            log_file_path: None,
            http_timeout_seconds: default_http_timeout(),
            jitter_max_ms: default_jitter_max_ms(),
            roster_batch_size: default_roster_batch_size(),
            auto_export_interval_minutes: default_auto_export_interval(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location, falling back
    /// to defaults when no file exists. Environment variables override file
    /// values.
    ///
    /// # Environment Variables
    /// - `GRIDIRON_BLAZE_URL` - Override the upstream base URL
    /// - `GRIDIRON_TOKEN_URL` - Override the OAuth token URL
    /// - `GRIDIRON_DATA_DIR` - Override the league store directory
    /// - `GRIDIRON_LOG_FILE` - Override log file path
    /// - `GRIDIRON_HTTP_TIMEOUT` - Override HTTP timeout in seconds (default: 60)
    /// - `GRIDIRON_JITTER_MS` - Override the weekly fetch jitter window (default: 1000)
    /// - `GRIDIRON_ROSTER_BATCH` - Override the roster group size (default: 4)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(AppError)` - Error occurred during load or validation
    pub async fn load() -> Result<Self, AppError> {
        let config_path = get_config_path();

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies the `GRIDIRON_*` environment overrides. Unparseable numeric
    /// values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(env_vars::BLAZE_BASE_URL) {
            self.blaze_base_url = url;
        }

        if let Ok(url) = std::env::var(env_vars::TOKEN_URL) {
            self.token_url = url;
        }

        if let Ok(data_dir) = std::env::var(env_vars::DATA_DIR) {
            self.data_dir = Some(data_dir);
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }

        if let Some(jitter) = std::env::var(env_vars::JITTER_MS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.jitter_max_ms = jitter;
        }

        if let Some(batch) = std::env::var(env_vars::ROSTER_BATCH)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.roster_batch_size = batch;
        }
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(
            &self.blaze_base_url,
            &self.token_url,
            &self.log_file_path,
            self.http_timeout_seconds,
            self.roster_batch_size,
        )
    }

    /// League store directory, explicit or the platform default
    pub fn data_dir(&self) -> String {
        self.data_dir.clone().unwrap_or_else(get_data_dir_path)
    }

    /// Scheduler knobs carried by this configuration
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            roster_batch_size: self.roster_batch_size,
            jitter_max_ms: self.jitter_max_ms,
        }
    }

    /// Saves current configuration to the default config file location.
    pub async fn save(&self) -> Result<(), AppError> {
        let config_path = get_config_path();
        self.save_to_path(&config_path).await
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout.
    ///
    /// # Notes
    /// - Shows config file location and the effective settings
    /// - Reports when no config file exists and defaults are in use
    pub async fn display() -> Result<(), AppError> {
        let config_path = get_config_path();
        let log_dir = get_log_dir_path();
        let config = Config::load().await?;

        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        println!("{config_path}");
        if !Path::new(&config_path).exists() {
            println!("(Not created yet, showing defaults)");
        }
        println!("────────────────────────────────────");
        println!("Upstream Base URL:");
        println!("{}", config.blaze_base_url);
        println!("────────────────────────────────────");
        println!("Token URL:");
        println!("{}", config.token_url);
        println!("────────────────────────────────────");
        println!("League Store:");
        println!("{}", config.data_dir());
        println!("────────────────────────────────────");
        println!("HTTP Timeout:");
        println!("{} seconds", config.http_timeout_seconds);
        println!("────────────────────────────────────");
        println!("Export Tuning:");
        println!("jitter up to {} ms", config.jitter_max_ms);
        println!("{} rosters per group", config.roster_batch_size);
        println!(
            "auto export every {} minutes",
            config.auto_export_interval_minutes
        );
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &config.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/gridiron_export.log");
            println!("(Default location)");
        }

        Ok(())
    }

    /// Saves configuration to a custom file path.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn clear_env() {
        for name in [
            env_vars::BLAZE_BASE_URL,
            env_vars::TOKEN_URL,
            env_vars::DATA_DIR,
            env_vars::LOG_FILE,
            env_vars::HTTP_TIMEOUT,
            env_vars::JITTER_MS,
            env_vars::ROSTER_BATCH,
        ] {
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe { std::env::remove_var(name) };
        }
    }

    #[tokio::test]
    async fn test_config_load_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_path_str = config_path.to_string_lossy();

        let config_content = r#"
blaze_base_url = "https://wal.example.com/wal"
roster_batch_size = 2
"#;
        tokio::fs::write(&config_path, config_content)
            .await
            .unwrap();

        let config = Config::load_from_path(&config_path_str).await.unwrap();

        assert_eq!(config.blaze_base_url, "https://wal.example.com/wal");
        assert_eq!(config.roster_batch_size, 2);
        assert_eq!(config.token_url, upstream::DEFAULT_TOKEN_URL);
        assert_eq!(config.http_timeout_seconds, 60);
        assert_eq!(config.jitter_max_ms, 1000);
        assert_eq!(config.auto_export_interval_minutes, 15);
        assert_eq!(config.log_file_path, None);
    }

    #[tokio::test]
    async fn test_config_save_and_load_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_dir = temp_dir.path().join("gridiron_export");
        let config_path = config_dir.join("config.toml");
        let config_path_str = config_path.to_string_lossy();
        let original_config = Config {
            data_dir: Some("/srv/leagues".to_string()),
            log_file_path: Some("/custom/log/path".to_string()),
            jitter_max_ms: 250,
            ..Config::default()
        };
        original_config
            .save_to_path(&config_path_str)
            .await
            .unwrap();
        assert!(config_dir.exists());

        let loaded_config = Config::load_from_path(&config_path_str).await.unwrap();
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_serialization_skips_unset_paths() {
        let toml_string = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_string.contains("blaze_base_url = "));
        assert!(!toml_string.contains("log_file_path"));
        assert!(!toml_string.contains("data_dir"));
    }

    #[tokio::test]
    async fn test_config_malformed_toml_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("malformed_config.toml");
        let config_path_str = config_path.to_string_lossy();

        let malformed_content = r#"
blaze_base_url = "https://wal.example.com"
[invalid_section
"#;
        tokio::fs::write(&config_path, malformed_content)
            .await
            .unwrap();

        let result = Config::load_from_path(&config_path_str).await;
        assert!(matches!(result.unwrap_err(), AppError::TomlDeserialize(_)));
    }

    #[tokio::test]
    async fn test_config_load_from_nonexistent_path() {
        let result = Config::load_from_path("/nonexistent/path/config.toml").await;
        assert!(matches!(result.unwrap_err(), AppError::Io(_)));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var(env_vars::BLAZE_BASE_URL, "http://127.0.0.1:9000");
            std::env::set_var(env_vars::JITTER_MS, "0");
            std::env::set_var(env_vars::ROSTER_BATCH, "8");
            std::env::set_var(env_vars::HTTP_TIMEOUT, "not-a-number");
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.blaze_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.jitter_max_ms, 0);
        assert_eq!(config.roster_batch_size, 8);
        assert_eq!(config.http_timeout_seconds, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override_can_fail_validation() {
        clear_env();
        // SAFETY: serialized test
        unsafe { std::env::set_var(env_vars::ROSTER_BATCH, "0") };

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_settings_and_paths() {
        let config = Config {
            roster_batch_size: 3,
            jitter_max_ms: 10,
            ..Config::default()
        };
        let settings = config.export_settings();
        assert_eq!(settings.roster_batch_size, 3);
        assert_eq!(settings.jitter_max_ms, 10);

        assert!(Config::get_config_path().ends_with("config.toml"));
        assert!(Config::get_log_dir_path().contains("gridiron_export"));
        assert!(config.data_dir().ends_with("leagues"));
    }
}
