//! Typed per-entity accessors over [`RequestExecutor`]. No caching, no retry
//! and no session handling happen here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::instrument;

use super::executor::RequestExecutor;
use super::models::{Credential, LeagueHub, LeagueList, Session};
use super::request::{ExportParams, Request};
use crate::error::AppError;
use crate::export::weeks::WeekSelector;

/// The eight per-week datasets: the schedule plus seven stat tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeeklyDataset {
    Schedules,
    TeamStats,
    Passing,
    Rushing,
    Receiving,
    Defense,
    Kicking,
    Punting,
}

impl WeeklyDataset {
    pub const ALL: [WeeklyDataset; 8] = [
        WeeklyDataset::Schedules,
        WeeklyDataset::TeamStats,
        WeeklyDataset::Passing,
        WeeklyDataset::Rushing,
        WeeklyDataset::Receiving,
        WeeklyDataset::Defense,
        WeeklyDataset::Kicking,
        WeeklyDataset::Punting,
    ];

    /// Export type segment of the bulk endpoint, also used by destinations
    pub fn export_type(&self) -> &'static str {
        match self {
            WeeklyDataset::Schedules => "schedules",
            WeeklyDataset::TeamStats => "teamstats",
            WeeklyDataset::Passing => "passing",
            WeeklyDataset::Rushing => "rushing",
            WeeklyDataset::Receiving => "receiving",
            WeeklyDataset::Defense => "defense",
            WeeklyDataset::Kicking => "kicking",
            WeeklyDataset::Punting => "punting",
        }
    }
}

impl fmt::Display for WeeklyDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_type())
    }
}

/// Accessors for one league connection. Every authenticated call consumes the
/// next value of the request counter; read it back with
/// [`LeagueDataFacade::request_counter`] to persist it.
#[derive(Debug)]
pub struct LeagueDataFacade {
    executor: RequestExecutor,
    credential: Credential,
    session: Session,
    counter: AtomicU32,
}

impl LeagueDataFacade {
    pub fn new(executor: RequestExecutor, credential: Credential, session: Session) -> Self {
        let counter = AtomicU32::new(session.request_counter);
        Self {
            executor,
            credential,
            session,
            counter,
        }
    }

    /// Counter value the next authenticated call will use
    pub fn request_counter(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn session_key(&self) -> &str {
        &self.session.session_key
    }

    /// The session as it should be persisted after this facade is done
    pub fn current_session(&self) -> Session {
        Session {
            request_counter: self.request_counter(),
            ..self.session.clone()
        }
    }

    fn next_session(&self) -> Session {
        Session {
            request_counter: self.counter.fetch_add(1, Ordering::SeqCst),
            ..self.session.clone()
        }
    }

    async fn bulk(&self, export_type: &str, params: ExportParams) -> Result<Value, AppError> {
        self.executor
            .fetch_bulk(&self.credential, &self.session, export_type, &params)
            .await
    }

    pub async fn leagues(&self) -> Result<LeagueList, AppError> {
        let session = self.next_session();
        self.executor
            .send(&self.credential, &session, Request::my_leagues())
            .await
    }

    #[instrument(skip(self))]
    pub async fn league_hub(&self, league_id: u64) -> Result<LeagueHub, AppError> {
        let session = self.next_session();
        self.executor
            .send(&self.credential, &session, Request::league_hub(league_id))
            .await
    }

    pub async fn teams(&self, league_id: u64) -> Result<Value, AppError> {
        self.bulk("leagueteams", ExportParams::league(league_id))
            .await
    }

    pub async fn standings(&self, league_id: u64) -> Result<Value, AppError> {
        self.bulk("standings", ExportParams::league(league_id)).await
    }

    /// Any of the eight per-week datasets for one week
    pub async fn weekly(
        &self,
        league_id: u64,
        dataset: WeeklyDataset,
        week: WeekSelector,
    ) -> Result<Value, AppError> {
        let params = ExportParams {
            week_index: Some(week.week_index),
            stage_index: Some(week.stage.stage_index()),
            ..ExportParams::league(league_id)
        };
        self.bulk(dataset.export_type(), params).await
    }

    pub async fn schedule(&self, league_id: u64, week: WeekSelector) -> Result<Value, AppError> {
        self.weekly(league_id, WeeklyDataset::Schedules, week).await
    }

    pub async fn team_roster(&self, league_id: u64, team_id: u64) -> Result<Value, AppError> {
        let params = ExportParams {
            team_id: Some(team_id),
            ..ExportParams::league(league_id)
        };
        self.bulk("roster", params).await
    }

    pub async fn free_agents(&self, league_id: u64) -> Result<Value, AppError> {
        let params = ExportParams {
            return_free_agents: Some(true),
            ..ExportParams::league(league_id)
        };
        self.bulk("freeagents", params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{sample_credential, sample_session};
    use crate::upstream::http_client::create_test_http_client;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    fn facade(server: &MockServer, counter: u32) -> LeagueDataFacade {
        let mut session = sample_session("key-9");
        session.request_counter = counter;
        LeagueDataFacade::new(
            RequestExecutor::new(create_test_http_client(), server.uri()),
            sample_credential(),
            session,
        )
    }

    #[tokio::test]
    async fn test_weekly_posts_week_and_stage_indices() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export/rushing/key-9"))
            .and(body_json(json!({ "leagueId": 5, "weekIndex": 3, "stageIndex": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let value = facade(&mock_server, 0)
            .weekly(5, WeeklyDataset::Rushing, WeekSelector::season(3).unwrap())
            .await
            .unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_roster_and_free_agent_bodies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export/roster/key-9"))
            .and(body_json(json!({ "leagueId": 5, "teamId": 77 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rosterInfoList": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/export/freeagents/key-9"))
            .and(body_json(json!({ "leagueId": 5, "returnFreeAgents": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rosterInfoList": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let facade = facade(&mock_server, 0);
        facade.team_roster(5, 77).await.unwrap();
        facade.free_agents(5).await.unwrap();
        // bulk reads do not consume the request counter
        assert_eq!(facade.request_counter(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_calls_advance_counter() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/key-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseInfo": { "value": {
                    "careerHubInfo": { "seasonInfo": { "seasonWeek": 4, "seasonWeekType": 1 } },
                    "teamIdInfoList": []
                } }
            })))
            .expect(2)
            .mount(&mock_server)
            .await;

        let facade = facade(&mock_server, 10);
        let hub = facade.league_hub(5).await.unwrap();
        assert_eq!(hub.career_hub_info.season_info.season_week, 4);
        facade.league_hub(5).await.unwrap();
        assert_eq!(facade.request_counter(), 12);
    }

    #[tokio::test]
    async fn test_errors_propagate_untouched() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process/key-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "errorname": "LEAGUE_NOT_FOUND" }
            })))
            .mount(&mock_server)
            .await;

        let error = facade(&mock_server, 0).league_hub(5).await.unwrap_err();
        assert!(error.is_protocol_error());
    }
}
