//! Application-wide constants and configuration values
//!
//! This module centralizes the upstream wire constants and the export defaults
//! so that the protocol quirks live in one place.

/// Default timeout for HTTP requests in seconds. Export payloads are large.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 60;

/// Maximum number of idle connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 32;

/// Upstream endpoints and fixed request values
pub mod upstream {
    /// Base URL of the game backend web access layer
    pub const DEFAULT_BLAZE_BASE_URL: &str = "https://wal2.tools.gos.bio-iad.ea.com/wal";

    /// OAuth token endpoint used for refresh and authorization-code grants
    pub const DEFAULT_TOKEN_URL: &str = "https://accounts.ea.com/connect/token";

    /// OAuth client registered for the companion app
    pub const CLIENT_ID: &str = "MCA_25_COMP_APP";

    /// OAuth client secret shipped inside the companion app
    pub const CLIENT_SECRET: &str =
        "wfGAWnrxLroZOwwELYA2ZrAuaycuF2WDb00zOLv48Sb79viJDGlyD6OyK8pM5eIiv_20240731135155";

    /// Redirect URI the authorization code was issued for
    pub const REDIRECT_URL: &str = "http://127.0.0.1/success";

    /// Authentication source identifier sent with every token grant
    pub const AUTH_SOURCE: &str = "317239";

    /// Fixed device identifier placed in every authenticated envelope
    pub const DEVICE_ID: &str = "444d362e8e067fe2";

    /// Placeholder client address placed in every authenticated envelope
    pub const PLACEHOLDER_IP: &str = "127.0.0.1";

    /// Value of the `X-Application-Key` header
    pub const APPLICATION_KEY: &str = "MADDEN-MCA";

    /// Spoofed mobile user agent expected by the upstream
    pub const USER_AGENT: &str =
        "Dalvik/2.1.0 (Linux; U; Android 13; sdk_gphone_x86_64 Build/TE1A.220922.031)";

    /// `apiVersion` field of the authenticated envelope
    pub const API_VERSION: u32 = 2;

    /// `clientDevice` field of the authenticated envelope
    pub const CLIENT_DEVICE: u32 = 3;

    /// Header carrying the console-specific service identifier
    pub const BLAZE_ID_HEADER: &str = "X-BLAZE-ID";

    /// Header asking the gateway not to send XML void responses
    pub const BLAZE_VOID_RESP_HEADER: &str = "X-BLAZE-VOID-RESP";

    /// Header carrying the fixed application key
    pub const APPLICATION_KEY_HEADER: &str = "X-Application-Key";
}

/// Secrets and markers of the per-request message authentication
pub mod auth {
    /// Marker placed as the first field of the signed record
    pub const STATIC_MARKER: &str = "05e6a7ead5584ab4";

    /// Secret appended to the random prefix before deriving the keystream
    pub const KEYSTREAM_SECRET: [u8; 16] = [
        0x63, 0x42, 0x03, 0x36, 0x20, 0x17, 0xbf, 0x72, 0xf7, 0x0b, 0xa9, 0x00, 0xc0, 0xaa, 0x4e,
        0x6b,
    ];

    /// Secret prepended to the auth data before computing the auth code
    pub const SIGNING_SECRET: [u8; 20] = [
        0x3a, 0x53, 0x41, 0x35, 0x21, 0x46, 0x4c, 0x3b, 0x65, 0x31, 0x32, 0x65, 0x30, 0x70, 0x5b,
        0x70, 0x20, 0x3a, 0x29, 0x00,
    ];

    /// Fixed `authType` the upstream expects
    pub const AUTH_TYPE: u32 = 17_039_361;

    /// Length of the random prefix in bytes
    pub const RANDOM_PREFIX_LEN: usize = 4;
}

/// Export scheduling defaults
pub mod export {
    /// Team roster fetches allowed in flight at once
    pub const DEFAULT_ROSTER_BATCH_SIZE: usize = 4;

    /// Upper bound of the per-fetch start delay (milliseconds)
    pub const DEFAULT_JITTER_MAX_MS: u64 = 1000;

    /// Minutes between background exports in watch mode
    pub const DEFAULT_AUTO_EXPORT_INTERVAL_MINUTES: u64 = 15;

    /// Highest preseason week index
    pub const PRESEASON_MAX_INDEX: u8 = 3;

    /// Highest regular/postseason week index
    pub const SEASON_MAX_INDEX: u8 = 22;

    /// Season slot the upstream never fills
    pub const RESERVED_SEASON_INDEX: u8 = 21;
}

/// Environment variable names
pub mod env_vars {
    /// Override for the upstream base URL
    pub const BLAZE_BASE_URL: &str = "GRIDIRON_BLAZE_URL";

    /// Override for the OAuth token URL
    pub const TOKEN_URL: &str = "GRIDIRON_TOKEN_URL";

    /// Override for the league store directory
    pub const DATA_DIR: &str = "GRIDIRON_DATA_DIR";

    /// Override for the log file path
    pub const LOG_FILE: &str = "GRIDIRON_LOG_FILE";

    /// Override for the HTTP timeout in seconds
    pub const HTTP_TIMEOUT: &str = "GRIDIRON_HTTP_TIMEOUT";

    /// Override for the jitter window in milliseconds
    pub const JITTER_MS: &str = "GRIDIRON_JITTER_MS";

    /// Override for the roster batch size
    pub const ROSTER_BATCH: &str = "GRIDIRON_ROSTER_BATCH";
}

/// Remediation text shown with account errors
pub const ACCOUNT_REMEDIATION: &str = "Unlink the league and reconnect your EA account";
