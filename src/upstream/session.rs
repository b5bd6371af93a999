//! Upstream session lifecycle: login and the check-then-relogin check that
//! runs once before every batch of calls.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::executor::RequestExecutor;
use super::models::{Credential, LeagueList, LoginResponse, Session};
use super::request::Request;
use super::urls::build_login_url;
use crate::constants::upstream::BLAZE_ID_HEADER;
use crate::error::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    access_token: &'a str,
    product_name: &'a str,
}

/// What a successful login reveals besides the session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDetails {
    pub session: Session,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    executor: RequestExecutor,
}

impl SessionManager {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Logs in and returns a fresh session with a zeroed request counter.
    pub async fn establish(&self, credential: &Credential) -> Result<Session, AppError> {
        Ok(self.login(credential).await?.session)
    }

    /// Logs in and also returns the persona display name.
    #[instrument(skip(self, credential), fields(platform = %credential.platform))]
    pub async fn login(&self, credential: &Credential) -> Result<LoginDetails, AppError> {
        if Utc::now() > credential.expiry {
            return Err(AppError::CredentialExpired {
                expiry: credential.expiry,
            });
        }

        let url = build_login_url(self.executor.base_url());
        let body = LoginRequest {
            access_token: &credential.access_token,
            product_name: credential.platform.product_name(),
        };
        let response = self
            .executor
            .client()
            .post(&url)
            .header(BLAZE_ID_HEADER, credential.platform.blaze_service())
            .json(&body)
            .send()
            .await?;
        let text = response.text().await?;

        // Non-JSON login replies mean the account or its entitlement is broken.
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            AppError::account_error(
                format!("Login returned a non-JSON response: {e}"),
                Some(text.clone()),
            )
        })?;
        if let Some(envelope) = value.get("error").filter(|e| !e.is_null()) {
            return Err(AppError::account_error(
                format!("Login was refused: {envelope}"),
                Some(text),
            ));
        }

        let login: LoginResponse = serde_json::from_value(value)
            .map_err(|e| AppError::unexpected_structure(e.to_string(), &url))?;
        let info = login.user_login_info;
        info!(
            "Established upstream session for persona {}",
            info.persona_details.persona_id
        );

        Ok(LoginDetails {
            session: Session {
                account_numeric_id: info.persona_details.persona_id,
                session_key: info.session_key,
                request_counter: 0,
            },
            display_name: info.persona_details.display_name,
        })
    }

    /// Checks the session once. The check signs the current request counter,
    /// so a live session comes back with the counter advanced past it. A
    /// structured upstream error triggers exactly one re-login that keeps the
    /// caller's request counter; every other failure propagates untouched.
    #[instrument(skip(self, credential, session))]
    pub async fn validate(
        &self,
        credential: &Credential,
        session: Session,
    ) -> Result<Session, AppError> {
        let check = self
            .executor
            .send::<LeagueList>(credential, &session, Request::my_leagues())
            .await;

        match check {
            Ok(_) => {
                debug!("Session check succeeded");
                Ok(Session {
                    request_counter: session.request_counter.wrapping_add(1),
                    ..session
                })
            }
            Err(e) if e.is_protocol_error() => {
                warn!("Session check rejected ({}), logging in again", e);
                let fresh = self.establish(credential).await?;
                Ok(Session {
                    request_counter: session.request_counter,
                    ..fresh
                })
            }
            Err(e) => Err(e),
        }
    }
}
