use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Structured error envelope returned by the upstream inside a parsed body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamError {
    #[serde(default)]
    pub errorname: Option<String>,
    #[serde(default)]
    pub errorcode: Option<i64>,
    #[serde(default)]
    pub component: Option<i64>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl UpstreamError {
    /// Builds the envelope from the raw `error` value, keeping the original JSON.
    pub fn from_value(value: serde_json::Value) -> Self {
        let mut parsed: UpstreamError = serde_json::from_value(value.clone()).unwrap_or_default();
        parsed.raw = value;
        parsed
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.errorname, self.errorcode) {
            (Some(name), Some(code)) => write!(f, "{name} ({code})"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(code)) => write!(f, "error code {code}"),
            (None, None) => write!(f, "{}", self.raw),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Fatal, user-actionable problem with the linked account.
    #[error("{message}. {remediation}")]
    Account {
        message: String,
        remediation: String,
        raw_response: Option<String>,
    },

    /// Parsed upstream response carrying an explicit error envelope.
    #[error("Upstream rejected the request: {0}")]
    Protocol(UpstreamError),

    #[error("Transport failure talking to upstream: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("TLS setup error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Access token expired at {expiry}; refresh it before issuing calls")]
    CredentialExpired { expiry: chrono::DateTime<chrono::Utc> },

    #[error("API returned unexpected data structure: {message} (URL: {url})")]
    UnexpectedStructure { message: String, url: String },

    #[error("No connection stored for league {league_id}")]
    NotConnected { league_id: u64 },

    #[error("Destination rejected export ({status}): {url}")]
    DestinationRejected { url: String, status: u16 },

    #[error("Invalid week selector: {0}")]
    InvalidWeek(String),

    #[error("League store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log setup error: {0}")]
    LogSetup(String),
}

impl AppError {
    /// Create an account error with the standard remediation text
    pub fn account_error(message: impl Into<String>, raw_response: Option<String>) -> Self {
        Self::Account {
            message: message.into(),
            remediation: crate::constants::ACCOUNT_REMEDIATION.to_string(),
            raw_response,
        }
    }

    /// Create a protocol error from the raw `error` value of a response
    pub fn protocol_error(error: serde_json::Value) -> Self {
        Self::Protocol(UpstreamError::from_value(error))
    }

    pub fn unexpected_structure(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::UnexpectedStructure {
            message: message.into(),
            url: url.into(),
        }
    }

    pub fn destination_rejected(url: impl Into<String>, status: u16) -> Self {
        Self::DestinationRejected {
            url: url.into(),
            status,
        }
    }

    /// Create a configuration error with context
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a log setup error with context
    pub fn log_setup_error(msg: impl Into<String>) -> Self {
        Self::LogSetup(msg.into())
    }

    pub fn store_error(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// True for fatal account problems that need user action.
    pub fn is_account_error(&self) -> bool {
        matches!(self, AppError::Account { .. })
    }

    /// True only for a structured upstream error envelope. This is the single
    /// error kind that permits a re-login.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, AppError::Protocol(_))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Raw upstream body attached to an account error, if any
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AppError::Account { raw_response, .. } => raw_response.as_deref(),
            _ => None,
        }
    }
}
