//! Sends authenticated process calls and session-scoped bulk export calls,
//! and classifies what comes back.

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::auth_codec::{self, MessageAuth};
use super::models::{Credential, Session};
use super::request::{ExportParams, Request};
use super::urls::{build_export_url, build_process_url};
use crate::constants::upstream::{
    API_VERSION, BLAZE_ID_HEADER, CLIENT_DEVICE, DEVICE_ID, PLACEHOLDER_IP,
};
use crate::error::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInfo<'a> {
    message_expiration_time: i64,
    device_id: &'a str,
    command_name: &'a str,
    component_id: u32,
    command_id: u32,
    ip_address: &'a str,
    request_payload: String,
    component_name: &'a str,
    message_auth_data: &'a MessageAuth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    api_version: u32,
    client_device: u32,
    request_info: String,
}

/// Wraps a request into the wire envelope. `requestInfo` is a JSON string and
/// the `requestPayload` inside it is itself a JSON string.
pub(crate) fn build_envelope(
    request: &Request,
    auth: &MessageAuth,
    expiration: i64,
) -> Result<Envelope, AppError> {
    let info = RequestInfo {
        message_expiration_time: expiration,
        device_id: DEVICE_ID,
        command_name: request.command_name,
        component_id: request.component_id,
        command_id: request.command_id,
        ip_address: PLACEHOLDER_IP,
        request_payload: serde_json::to_string(&request.payload.to_value())?,
        component_name: request.component_name,
        message_auth_data: auth,
    };
    Ok(Envelope {
        api_version: API_VERSION,
        client_device: CLIENT_DEVICE,
        request_info: serde_json::to_string(&info)?,
    })
}

/// Classifies a process endpoint body: unparseable text is an account problem,
/// an `error` object is a protocol error, anything else is unwrapped from
/// `responseInfo.value` into the caller's type.
pub(crate) fn parse_process_response<T: DeserializeOwned>(
    text: &str,
    url: &str,
) -> Result<T, AppError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        error!("Unparseable process response from {}: {}", url, e);
        AppError::account_error(
            format!("Upstream returned an unreadable response: {e}"),
            Some(text.to_string()),
        )
    })?;

    if let Some(envelope) = value.get("error").filter(|e| !e.is_null()) {
        debug!("Upstream error envelope from {}: {}", url, envelope);
        return Err(AppError::protocol_error(envelope.clone()));
    }

    let inner = match value.pointer("/responseInfo/value") {
        Some(inner) => inner.clone(),
        None => value,
    };
    serde_json::from_value(inner).map_err(|e| AppError::unexpected_structure(e.to_string(), url))
}

/// Drops C0 and C1 control characters the upstream leaks into string fields.
pub fn strip_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F..=0x9F))
        .collect()
}

#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    base_url: String,
}

impl RequestExecutor {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one authenticated call through the process endpoint.
    #[instrument(skip(self, credential, session, request), fields(command = request.command_name))]
    pub async fn send<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        session: &Session,
        request: Request,
    ) -> Result<T, AppError> {
        if Utc::now() > credential.expiry {
            return Err(AppError::CredentialExpired {
                expiry: credential.expiry,
            });
        }

        let auth = auth_codec::compute(session.account_numeric_id, session.request_counter)?;
        let envelope = build_envelope(&request, &auth, Utc::now().timestamp())?;
        let url = build_process_url(&self.base_url, &session.session_key);
        debug!(
            "Sending {} (request {}) to process endpoint",
            request.command_name, session.request_counter
        );

        let response = self
            .client
            .post(&url)
            .header(BLAZE_ID_HEADER, credential.platform.blaze_service())
            .json(&envelope)
            .send()
            .await?;
        let text = response.text().await?;
        debug!("Process response length: {} bytes", text.len());

        parse_process_response(&text, &url)
    }

    /// Fetches one bulk export. Bulk reads are session scoped but carry no
    /// per-call signature, and are never retried here.
    #[instrument(skip(self, credential, session, body))]
    pub async fn fetch_bulk(
        &self,
        credential: &Credential,
        session: &Session,
        export_type: &str,
        body: &ExportParams,
    ) -> Result<Value, AppError> {
        let url = build_export_url(&self.base_url, export_type, &session.session_key);
        let response = self
            .client
            .post(&url)
            .header(BLAZE_ID_HEADER, credential.platform.blaze_service())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Bulk export {} failed with HTTP {}", export_type, status);
            return Err(AppError::account_error(
                format!("Bulk export '{export_type}' failed with HTTP {status}"),
                Some(text),
            ));
        }

        let cleaned = strip_control_characters(&text);
        let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
            error!("Unparseable bulk export {}: {}", export_type, e);
            AppError::account_error(
                format!("Bulk export '{export_type}' returned an unreadable response: {e}"),
                Some(text.clone()),
            )
        })?;

        if let Some(envelope) = value.get("error").filter(|e| !e.is_null()) {
            return Err(AppError::account_error(
                format!("Bulk export '{export_type}' was rejected: {envelope}"),
                Some(text),
            ));
        }

        debug!("Bulk export {} returned {} bytes", export_type, cleaned.len());
        Ok(value)
    }
}
