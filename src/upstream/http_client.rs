//! HTTP client creation and configuration utilities

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, HeaderMap, HeaderValue};
use rustls::{ClientConfig, RootCertStore, crypto::ring, version};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::upstream::{
    APPLICATION_KEY, APPLICATION_KEY_HEADER, BLAZE_VOID_RESP_HEADER, USER_AGENT,
};
use crate::error::AppError;

/// TLS settings shared by every client: the `ring` provider, TLS 1.2 and 1.3,
/// and the bundled webpki root set.
///
/// rustls never renegotiates and does not require the server to support
/// RFC 5746 secure renegotiation, so the upstream gateway's legacy TLS stack
/// is accepted without the "unsafe legacy renegotiation" rejection that
/// OpenSSL-backed clients hit.
pub fn tls_config() -> Result<ClientConfig, AppError> {
    let provider = Arc::new(ring::default_provider());
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&version::TLS12, &version::TLS13])?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

/// Creates the client used for every upstream call.
///
/// The TLS layer comes from [`tls_config`]. The fixed header set (charset,
/// accept, application key, void-response mode and the mobile user agent) is
/// installed as default headers; the console-specific `X-BLAZE-ID` header
/// varies per league and is added per request.
pub fn create_upstream_client(timeout_seconds: u64) -> Result<Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("UTF-8"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        APPLICATION_KEY_HEADER,
        HeaderValue::from_static(APPLICATION_KEY),
    );
    headers.insert(BLAZE_VOID_RESP_HEADER, HeaderValue::from_static("XML"));

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(crate::constants::HTTP_POOL_MAX_IDLE_PER_HOST)
        .use_preconfigured_tls(tls_config()?)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Creates the client used to push payloads to export destinations.
pub fn create_destination_client(timeout_seconds: u64) -> Result<Client, AppError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(crate::constants::HTTP_POOL_MAX_IDLE_PER_HOST)
        .use_preconfigured_tls(tls_config()?)
        .build()?;
    Ok(client)
}

/// Creates an HTTP client for testing with default timeout
#[cfg(test)]
pub fn create_test_http_client() -> Client {
    create_upstream_client(crate::constants::DEFAULT_HTTP_TIMEOUT_SECONDS)
        .expect("Failed to create test HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[test]
    fn test_tls_config_builds_with_bundled_roots() {
        let config = tls_config().unwrap();
        assert!(config.enable_sni);
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_destination_client_builds_without_global_provider() {
        assert!(create_destination_client(5).is_ok());
    }

    #[tokio::test]
    async fn test_upstream_client_sends_fixed_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header(APPLICATION_KEY_HEADER, APPLICATION_KEY))
            .and(header(BLAZE_VOID_RESP_HEADER, "XML"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = create_test_http_client()
            .get(format!("{}/ping", mock_server.uri()))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }
}
