use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Mutex;

use crate::error::AppError;
use crate::export::destination::{Destination, DestinationSink, ExportPayload};
use crate::upstream::auth_codec::decode_auth_data;
use crate::upstream::models::{Credential, Platform, Session};

/// Persona id shared by the sample credential and session
pub const SAMPLE_PERSONA_ID: i64 = 1_003_456_789;

/// A PS5 credential that stays valid for the lifetime of any test run.
pub fn sample_credential() -> Credential {
    Credential {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expiry: Utc
            .with_ymd_and_hms(2099, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        platform: Platform::Ps5,
        account_id: SAMPLE_PERSONA_ID.to_string(),
    }
}

pub fn sample_session(session_key: &str) -> Session {
    Session {
        account_numeric_id: SAMPLE_PERSONA_ID,
        session_key: session_key.to_string(),
        request_counter: 0,
    }
}

/// Builders for upstream response bodies
pub struct TestDataBuilder;

impl TestDataBuilder {
    /// Login reply carrying the given session key
    pub fn login_response(session_key: &str) -> Value {
        json!({
            "userLoginInfo": {
                "sessionKey": session_key,
                "personaDetails": { "personaId": SAMPLE_PERSONA_ID, "displayName": "coach" }
            }
        })
    }

    /// Process reply wrapping a value the way the upstream does
    pub fn process_response(value: Value) -> Value {
        json!({ "responseInfo": { "value": value } })
    }

    /// Process reply carrying a structured error envelope
    pub fn process_error(errorname: &str) -> Value {
        json!({ "error": { "errorname": errorname, "errorcode": 16384, "component": 2060 } })
    }

    /// League hub with the given calendar position and team ids
    pub fn league_hub(season_week: u8, season_week_type: u8, team_ids: &[u64]) -> Value {
        let teams: Vec<Value> = team_ids
            .iter()
            .map(|team_id| json!({ "teamId": team_id, "teamName": format!("Team {team_id}") }))
            .collect();
        Self::process_response(json!({
            "careerHubInfo": {
                "seasonInfo": {
                    "seasonWeek": season_week,
                    "seasonWeekType": season_week_type,
                    "calendarYear": 2025
                }
            },
            "teamIdInfoList": teams
        }))
    }

    pub fn my_leagues(league_ids: &[u64]) -> Value {
        let leagues: Vec<Value> = league_ids
            .iter()
            .map(|league_id| json!({ "leagueId": league_id, "leagueName": format!("League {league_id}") }))
            .collect();
        Self::process_response(json!({ "leagues": leagues }))
    }

    pub fn token_response(access_token: &str, expires_in: i64) -> Value {
        json!({
            "access_token": access_token,
            "refresh_token": "refresh-rotated",
            "expires_in": expires_in,
            "token_type": "Bearer"
        })
    }

    /// A destination subscribed only to the given categories
    pub fn destination(
        url: &str,
        league_info: bool,
        weekly_stats: bool,
        rosters: bool,
        auto_update: bool,
    ) -> Destination {
        Destination {
            league_info,
            weekly_stats,
            rosters,
            auto_update,
            ..Destination::new(url)
        }
    }
}

/// Command name and signed request id of a captured process-endpoint body.
/// `None` for bodies that are not authenticated envelopes.
pub fn signed_request(body: &[u8]) -> Option<(String, u32)> {
    let envelope: Value = serde_json::from_slice(body).ok()?;
    let info: Value = serde_json::from_str(envelope.get("requestInfo")?.as_str()?).ok()?;
    let command = info.get("commandName")?.as_str()?.to_string();
    let auth_data = info.pointer("/messageAuthData/authData")?.as_str()?;
    let record = decode_auth_data(auth_data).ok()?;
    Some((command, record.request_id))
}

/// One call observed by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub destination_url: String,
    pub platform: Platform,
    pub league_id: u64,
    pub label: String,
    pub payload: ExportPayload,
}

/// Sink that records every delivery in call order. Optionally fails every
/// delivery whose label matches.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
    fail_label: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(label: impl Into<String>) -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail_label: Some(label.into()),
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|deliveries| deliveries.clone())
            .unwrap_or_default()
    }

    /// Labels delivered to one destination, in call order
    pub fn labels_for(&self, destination_url: &str) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .filter(|delivery| delivery.destination_url == destination_url)
            .map(|delivery| delivery.label)
            .collect()
    }
}

#[async_trait]
impl DestinationSink for RecordingSink {
    async fn deliver(
        &self,
        destination: &Destination,
        platform: Platform,
        league_id: u64,
        payload: &ExportPayload,
    ) -> Result<(), AppError> {
        let label = payload.label();
        if self.fail_label.as_deref() == Some(label.as_str()) {
            return Err(AppError::destination_rejected(&destination.url, 500));
        }
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(Delivery {
                destination_url: destination.url.clone(),
                platform,
                league_id,
                label,
                payload: payload.clone(),
            });
        }
        Ok(())
    }
}
