//! Request value objects for the authenticated process endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const CAREER_COMPONENT_ID: u32 = 2060;
const CAREER_COMPONENT_NAME: &str = "careermode";

/// Payload shapes for the upstream commands this crate issues.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    /// Commands that take no arguments
    Empty,
    /// Commands scoped to one league
    League { league_id: u64 },
    /// Escape hatch for commands without a modelled schema
    Opaque(Map<String, Value>),
}

impl RequestPayload {
    pub fn to_value(&self) -> Value {
        match self {
            RequestPayload::Empty => Value::Object(Map::new()),
            RequestPayload::League { league_id } => json!({ "leagueId": league_id }),
            RequestPayload::Opaque(map) => Value::Object(map.clone()),
        }
    }
}

/// One upstream call. Built per call and consumed by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub command_name: &'static str,
    pub component_id: u32,
    pub command_id: u32,
    pub payload: RequestPayload,
    pub component_name: &'static str,
}

impl Request {
    /// Lists the leagues the signed-in persona belongs to. Side-effect free,
    /// which also makes it the session check.
    pub fn my_leagues() -> Self {
        Self {
            command_name: "Mobile_GetMyLeagues",
            component_id: CAREER_COMPONENT_ID,
            command_id: 801,
            payload: RequestPayload::Empty,
            component_name: CAREER_COMPONENT_NAME,
        }
    }

    /// League hub: season calendar plus the team list.
    pub fn league_hub(league_id: u64) -> Self {
        Self {
            command_name: "Mobile_Career_GetLeagueHub",
            component_id: CAREER_COMPONENT_ID,
            command_id: 811,
            payload: RequestPayload::League { league_id },
            component_name: CAREER_COMPONENT_NAME,
        }
    }
}

/// Parameter body of a bulk export call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub league_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_free_agents: Option<bool>,
}

impl ExportParams {
    pub fn league(league_id: u64) -> Self {
        Self {
            league_id,
            week_index: None,
            stage_index: None,
            team_id: None,
            return_free_agents: None,
        }
    }
}
