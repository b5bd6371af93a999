//! URL building utilities for upstream endpoints

/// Builds the login URL that exchanges an access token for a session.
///
/// # Example
/// ```
/// use gridiron_export::upstream::build_login_url;
///
/// let url = build_login_url("https://wal.example.com/wal");
/// assert_eq!(url, "https://wal.example.com/wal/authentication/login");
/// ```
pub fn build_login_url(base_url: &str) -> String {
    format!("{}/authentication/login", base_url.trim_end_matches('/'))
}

/// Builds the authenticated process URL for a session.
///
/// # Example
/// ```
/// use gridiron_export::upstream::build_process_url;
///
/// let url = build_process_url("https://wal.example.com/wal", "abc123");
/// assert_eq!(url, "https://wal.example.com/wal/process/abc123");
/// ```
pub fn build_process_url(base_url: &str, session_key: &str) -> String {
    format!("{}/process/{session_key}", base_url.trim_end_matches('/'))
}

/// Builds the bulk export URL for one export type and session.
///
/// # Example
/// ```
/// use gridiron_export::upstream::build_export_url;
///
/// let url = build_export_url("https://wal.example.com/wal/", "passing", "abc123");
/// assert_eq!(url, "https://wal.example.com/wal/export/passing/abc123");
/// ```
pub fn build_export_url(base_url: &str, export_type: &str, session_key: &str) -> String {
    format!(
        "{}/export/{export_type}/{session_key}",
        base_url.trim_end_matches('/')
    )
}
