//! OAuth token lifecycle: refresh-token grant and the initial
//! authorization-code exchange used when a league is first linked.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tracing::{error, info, instrument};

use super::models::{Credential, Platform, TokenResponse};
use crate::constants::upstream::{AUTH_SOURCE, CLIENT_ID, CLIENT_SECRET, REDIRECT_URL};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct TokenManager {
    client: Client,
    token_url: String,
}

impl TokenManager {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }

    /// Returns a credential that is valid now, refreshing it if it expired.
    pub async fn refresh(&self, credential: Credential) -> Result<Credential, AppError> {
        self.refresh_at(credential, Utc::now()).await
    }

    /// Same as [`TokenManager::refresh`] with an injected clock. A still-valid
    /// credential is returned untouched without any network call; a failed
    /// refresh is terminal for the caller.
    #[instrument(skip(self, credential), fields(platform = %credential.platform))]
    pub async fn refresh_at(
        &self,
        credential: Credential,
        now: DateTime<Utc>,
    ) -> Result<Credential, AppError> {
        if now <= credential.expiry {
            return Ok(credential);
        }

        info!("Access token expired at {}, refreshing", credential.expiry);
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
            ("release_type", "prod"),
            ("refresh_token", credential.refresh_token.as_str()),
            ("authentication_source", AUTH_SOURCE),
            ("token_format", "JWS"),
        ];
        let tokens = self.request_tokens(&params).await?;

        Ok(Credential {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.unwrap_or(credential.refresh_token),
            expiry: now + Duration::seconds(tokens.expires_in),
            platform: credential.platform,
            account_id: credential.account_id,
        })
    }

    /// Exchanges an authorization code for a brand new credential. The account
    /// id is filled in by the caller once a session reveals it.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        platform: Platform,
    ) -> Result<Credential, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
            ("redirect_uri", REDIRECT_URL),
            ("release_type", "prod"),
            ("authentication_source", AUTH_SOURCE),
            ("token_format", "JWS"),
        ];
        let now = Utc::now();
        let tokens = self.request_tokens(&params).await?;
        let refresh_token = tokens.refresh_token.ok_or_else(|| {
            AppError::account_error("Authorization code grant returned no refresh token", None)
        })?;

        Ok(Credential {
            access_token: tokens.access_token,
            refresh_token,
            expiry: now + Duration::seconds(tokens.expires_in),
            platform,
            account_id: String::new(),
        })
    }

    async fn request_tokens(&self, params: &[(&str, &str)]) -> Result<GrantedTokens, AppError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Token endpoint answered HTTP {}", status);
            return Err(AppError::account_error(
                format!("Token grant was rejected with HTTP {status}"),
                Some(text),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            AppError::account_error(
                format!("Token endpoint returned an unreadable response: {e}"),
                Some(text.clone()),
            )
        })?;

        match parsed.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(GrantedTokens {
                access_token,
                refresh_token: parsed.refresh_token,
                expires_in: parsed.expires_in.unwrap_or(0),
            }),
            _ => Err(AppError::account_error(
                "Token endpoint returned no access token",
                Some(text),
            )),
        }
    }
}

struct GrantedTokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}
