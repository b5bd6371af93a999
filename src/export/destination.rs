//! Export destinations, the payloads they receive and the sink seam through
//! which the scheduler delivers them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::weeks::WeekSelector;
use crate::error::AppError;
use crate::upstream::league::WeeklyDataset;
use crate::upstream::models::Platform;

/// Who triggered an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportContext {
    /// Explicit user action, every destination takes part
    Manual,
    /// Background trigger, only auto-update destinations take part
    Auto,
}

/// Groups of data a destination can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    LeagueInfo,
    WeeklyStats,
    Rosters,
}

/// A configured sink for exported league data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub url: String,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub league_info: bool,
    #[serde(default)]
    pub rosters: bool,
    #[serde(default)]
    pub weekly_stats: bool,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

impl Destination {
    /// A destination subscribed to everything, including automatic updates.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_update: true,
            league_info: true,
            rosters: true,
            weekly_stats: true,
            last_attempt: None,
            last_success: None,
            editable: true,
        }
    }

    pub fn participates_in(&self, context: ExportContext) -> bool {
        match context {
            ExportContext::Manual => true,
            ExportContext::Auto => self.auto_update,
        }
    }

    pub fn wants(&self, category: DataCategory) -> bool {
        match category {
            DataCategory::LeagueInfo => self.league_info,
            DataCategory::WeeklyStats => self.weekly_stats,
            DataCategory::Rosters => self.rosters,
        }
    }
}

/// One fetched payload together with the identifiers a destination needs to
/// file it. The body is passed through exactly as the upstream returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    LeagueTeams(Value),
    Standings(Value),
    Weekly {
        week: WeekSelector,
        dataset: WeeklyDataset,
        body: Value,
    },
    TeamRoster {
        team_id: u64,
        body: Value,
    },
    FreeAgents(Value),
}

impl ExportPayload {
    pub fn category(&self) -> DataCategory {
        match self {
            ExportPayload::LeagueTeams(_) | ExportPayload::Standings(_) => DataCategory::LeagueInfo,
            ExportPayload::Weekly { .. } => DataCategory::WeeklyStats,
            ExportPayload::TeamRoster { .. } | ExportPayload::FreeAgents(_) => {
                DataCategory::Rosters
            }
        }
    }

    pub fn body(&self) -> &Value {
        match self {
            ExportPayload::LeagueTeams(body)
            | ExportPayload::Standings(body)
            | ExportPayload::FreeAgents(body) => body,
            ExportPayload::Weekly { body, .. } | ExportPayload::TeamRoster { body, .. } => body,
        }
    }

    /// Short label used in logs and by recording sinks
    pub fn label(&self) -> String {
        match self {
            ExportPayload::LeagueTeams(_) => "leagueteams".to_string(),
            ExportPayload::Standings(_) => "standings".to_string(),
            ExportPayload::Weekly { week, dataset, .. } => format!("{week}/{dataset}"),
            ExportPayload::TeamRoster { team_id, .. } => format!("roster/{team_id}"),
            ExportPayload::FreeAgents(_) => "freeagents".to_string(),
        }
    }
}

/// Receives payloads for a destination. Each call is awaited on its own and
/// no idempotency is assumed.
#[async_trait]
pub trait DestinationSink: Send + Sync {
    async fn deliver(
        &self,
        destination: &Destination,
        platform: Platform,
        league_id: u64,
        payload: &ExportPayload,
    ) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_filtering() {
        let mut destination = Destination::new("https://example.com");
        assert!(destination.participates_in(ExportContext::Manual));
        assert!(destination.participates_in(ExportContext::Auto));

        destination.auto_update = false;
        assert!(destination.participates_in(ExportContext::Manual));
        assert!(!destination.participates_in(ExportContext::Auto));
    }

    #[test]
    fn test_destination_deserializes_with_defaults() {
        let destination: Destination =
            serde_json::from_value(json!({ "url": "https://example.com", "rosters": true }))
                .unwrap();
        assert!(destination.rosters);
        assert!(!destination.weekly_stats);
        assert!(!destination.auto_update);
        assert!(destination.editable);
        assert!(destination.last_attempt.is_none());
    }

    #[test]
    fn test_payload_categories_and_labels() {
        let weekly = ExportPayload::Weekly {
            week: WeekSelector::season(4).unwrap(),
            dataset: WeeklyDataset::Passing,
            body: json!({}),
        };
        assert_eq!(weekly.category(), DataCategory::WeeklyStats);
        assert_eq!(weekly.label(), "reg:5/passing");

        let roster = ExportPayload::TeamRoster {
            team_id: 9,
            body: json!([1]),
        };
        assert_eq!(roster.category(), DataCategory::Rosters);
        assert_eq!(roster.body(), &json!([1]));
        assert_eq!(
            ExportPayload::Standings(json!(null)).category(),
            DataCategory::LeagueInfo
        );
    }
}
