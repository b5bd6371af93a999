//! Destination sink that POSTs payloads to the companion-app export layout.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, instrument};

use super::destination::{Destination, DestinationSink, ExportPayload};
use crate::error::AppError;
use crate::upstream::models::Platform;

/// Builds the URL a payload is posted to.
///
/// # Example
/// ```
/// use gridiron_export::export::http_sink::build_destination_url;
/// use gridiron_export::export::destination::ExportPayload;
/// use gridiron_export::upstream::Platform;
/// use serde_json::json;
///
/// let url = build_destination_url(
///     "https://sink.example.com/",
///     Platform::Ps5,
///     42,
///     &ExportPayload::Standings(json!([])),
/// );
/// assert_eq!(url, "https://sink.example.com/ps5/42/standings");
/// ```
pub fn build_destination_url(
    base_url: &str,
    platform: Platform,
    league_id: u64,
    payload: &ExportPayload,
) -> String {
    let prefix = format!("{}/{platform}/{league_id}", base_url.trim_end_matches('/'));
    match payload {
        ExportPayload::LeagueTeams(_) => format!("{prefix}/leagueteams"),
        ExportPayload::Standings(_) => format!("{prefix}/standings"),
        ExportPayload::Weekly { week, dataset, .. } => format!(
            "{prefix}/week/{}/{}/{dataset}",
            week.stage.path_segment(),
            week.week_number()
        ),
        ExportPayload::TeamRoster { team_id, .. } => format!("{prefix}/team/{team_id}/roster"),
        ExportPayload::FreeAgents(_) => format!("{prefix}/freeagents/roster"),
    }
}

#[derive(Debug, Clone)]
pub struct HttpDestinationSink {
    client: Client,
}

impl HttpDestinationSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DestinationSink for HttpDestinationSink {
    #[instrument(skip(self, destination, payload), fields(payload = %payload.label()))]
    async fn deliver(
        &self,
        destination: &Destination,
        platform: Platform,
        league_id: u64,
        payload: &ExportPayload,
    ) -> Result<(), AppError> {
        let url = build_destination_url(&destination.url, platform, league_id, payload);
        let response = self
            .client
            .post(&url)
            .json(payload.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Destination {} answered HTTP {}", url, status);
            return Err(AppError::destination_rejected(url, status.as_u16()));
        }
        debug!("Delivered to {}", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::weeks::WeekSelector;
    use crate::upstream::league::WeeklyDataset;
    use crate::upstream::http_client::create_test_http_client;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    #[test]
    fn test_destination_urls() {
        let base = "https://sink.example.com/api";
        let weekly = ExportPayload::Weekly {
            week: WeekSelector::preseason(0).unwrap(),
            dataset: WeeklyDataset::TeamStats,
            body: json!({}),
        };
        assert_eq!(
            build_destination_url(base, Platform::Xbsx, 7, &weekly),
            "https://sink.example.com/api/xbsx/7/week/pre/1/teamstats"
        );
        let roster = ExportPayload::TeamRoster {
            team_id: 774242304,
            body: json!({}),
        };
        assert_eq!(
            build_destination_url(base, Platform::Pc, 7, &roster),
            "https://sink.example.com/api/pc/7/team/774242304/roster"
        );
        assert_eq!(
            build_destination_url(base, Platform::Pc, 7, &ExportPayload::FreeAgents(json!({}))),
            "https://sink.example.com/api/pc/7/freeagents/roster"
        );
        assert_eq!(
            build_destination_url(base, Platform::Pc, 7, &ExportPayload::LeagueTeams(json!({}))),
            "https://sink.example.com/api/pc/7/leagueteams"
        );
    }

    #[tokio::test]
    async fn test_deliver_posts_body_unchanged() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ps5/42/week/reg/3/schedules"))
            .and(body_json(json!({ "gameScheduleInfoList": [{ "weekIndex": 2 }] })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sink = HttpDestinationSink::new(create_test_http_client());
        let payload = ExportPayload::Weekly {
            week: WeekSelector::season(2).unwrap(),
            dataset: WeeklyDataset::Schedules,
            body: json!({ "gameScheduleInfoList": [{ "weekIndex": 2 }] }),
        };
        sink.deliver(
            &Destination::new(mock_server.uri()),
            Platform::Ps5,
            42,
            &payload,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_deliver_non_success_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let sink = HttpDestinationSink::new(create_test_http_client());
        let error = sink
            .deliver(
                &Destination::new(mock_server.uri()),
                Platform::Ps5,
                42,
                &ExportPayload::Standings(json!([])),
            )
            .await
            .unwrap_err();
        match error {
            AppError::DestinationRejected { status, url } => {
                assert_eq!(status, 503);
                assert!(url.ends_with("/ps5/42/standings"));
            }
            other => panic!("expected DestinationRejected, got {other:?}"),
        }
    }
}
