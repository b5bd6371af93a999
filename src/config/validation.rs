use crate::error::AppError;
use std::path::Path;

fn validate_url(name: &str, url: &str) -> Result<(), AppError> {
    if url.is_empty() {
        return Err(AppError::config_error(format!("{name} cannot be empty")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "{name} must start with http:// or https:// (got '{url}')"
        )));
    }
    Ok(())
}

/// Validates the configuration settings
///
/// # Validation Rules
/// - Upstream and token URLs must be http(s) URLs
/// - HTTP timeout and roster batch size must be at least 1
/// - If a log file path is provided, it cannot be empty and its parent
///   directory must exist or be creatable
pub fn validate_config(
    blaze_base_url: &str,
    token_url: &str,
    log_file_path: &Option<String>,
    http_timeout_seconds: u64,
    roster_batch_size: usize,
) -> Result<(), AppError> {
    validate_url("Upstream base URL", blaze_base_url)?;
    validate_url("Token URL", token_url)?;

    if http_timeout_seconds == 0 {
        return Err(AppError::config_error(
            "HTTP timeout must be at least 1 second",
        ));
    }
    if roster_batch_size == 0 {
        return Err(AppError::config_error("Roster batch size must be at least 1"));
    }

    if let Some(log_path) = log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://wal.example.com/wal";
    const TOKEN: &str = "https://accounts.example.com/connect/token";

    #[test]
    fn test_valid_config() {
        assert!(validate_config(BASE, TOKEN, &None, 60, 4).is_ok());
        assert!(validate_config("http://127.0.0.1:8080", TOKEN, &None, 1, 1).is_ok());
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(validate_config("wal.example.com", TOKEN, &None, 60, 4).is_err());
        assert!(validate_config(BASE, "", &None, 60, 4).is_err());
    }

    #[test]
    fn test_rejects_zero_limits() {
        let timeout = validate_config(BASE, TOKEN, &None, 0, 4).unwrap_err();
        assert!(timeout.to_string().contains("timeout"));
        let batch = validate_config(BASE, TOKEN, &None, 60, 0).unwrap_err();
        assert!(batch.to_string().contains("batch size"));
    }

    #[test]
    fn test_log_path_directory_is_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("nested").join("export.log");
        let log_path = Some(log_path.to_string_lossy().to_string());
        assert!(validate_config(BASE, TOKEN, &log_path, 60, 4).is_ok());
        assert!(temp_dir.path().join("nested").exists());

        assert!(validate_config(BASE, TOKEN, &Some(String::new()), 60, 4).is_err());
    }
}
