//! Decides what to pull for which weeks, drives the fetches and fans the
//! payloads out to destinations.
//!
//! An export runs in up to three phases:
//! 1. league info (teams and standings) once per export,
//! 2. the eight weekly datasets for every selected week, all in flight at
//!    once with a random start delay each, delivered only after the whole
//!    batch resolved,
//! 3. rosters in groups of `roster_batch_size` teams, each group delivered
//!    and dropped before the next one starts. Free agents ride along with
//!    the first group.
//!
//! The first failing fetch or delivery aborts the export.

use chrono::Utc;
use futures::future::{try_join, try_join_all};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::destination::{DataCategory, Destination, DestinationSink, ExportContext, ExportPayload};
use super::weeks::{WeekSelector, all_weeks, current_week, surrounding_weeks};
use crate::constants::export::{DEFAULT_JITTER_MAX_MS, DEFAULT_ROSTER_BATCH_SIZE};
use crate::error::AppError;
use crate::store::{ConnectionPatch, DestinationStamp, LeagueConnection, LeagueStore};
use crate::upstream::executor::RequestExecutor;
use crate::upstream::league::{LeagueDataFacade, WeeklyDataset};
use crate::upstream::models::{LeagueHub, Platform};
use crate::upstream::session::SessionManager;
use crate::upstream::token::TokenManager;

/// Tuning knobs for an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    /// Team rosters in flight at once
    pub roster_batch_size: usize,
    /// Upper bound of the random delay before each weekly fetch
    pub jitter_max_ms: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            roster_batch_size: DEFAULT_ROSTER_BATCH_SIZE,
            jitter_max_ms: DEFAULT_JITTER_MAX_MS,
        }
    }
}

/// Which weeks an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportIntent {
    CurrentWeek,
    SurroundingWeek,
    AllWeeks,
    Weeks(Vec<WeekSelector>),
}

/// Summary of a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub league_id: u64,
    pub destinations: usize,
    pub weeks: Vec<WeekSelector>,
    pub fetched: usize,
    pub delivered: usize,
    /// Number of teams in each roster group, in delivery order
    pub roster_groups: Vec<usize>,
}

pub struct ExportScheduler {
    executor: RequestExecutor,
    tokens: TokenManager,
    sessions: SessionManager,
    sink: Arc<dyn DestinationSink>,
    settings: ExportSettings,
}

impl ExportScheduler {
    pub fn new(
        executor: RequestExecutor,
        tokens: TokenManager,
        sink: Arc<dyn DestinationSink>,
        settings: ExportSettings,
    ) -> Self {
        let sessions = SessionManager::new(executor.clone());
        Self {
            executor,
            tokens,
            sessions,
            sink,
            settings: ExportSettings {
                roster_batch_size: settings.roster_batch_size.max(1),
                ..settings
            },
        }
    }

    pub fn settings(&self) -> ExportSettings {
        self.settings
    }

    /// Brings the stored credential and session up to date and returns a
    /// facade over them. Refreshes the token when it expired, checks the
    /// session (or logs in when there is none) and writes whatever changed
    /// back to the store.
    #[instrument(skip(self, store, connection), fields(league_id = connection.league_id))]
    pub async fn open_league(
        &self,
        store: &dyn LeagueStore,
        connection: &LeagueConnection,
    ) -> Result<LeagueDataFacade, AppError> {
        let league_id = connection.league_id;
        let credential = self.tokens.refresh(connection.credential.clone()).await?;
        let mut patch = ConnectionPatch::default();
        if credential != connection.credential {
            patch.credential = Some(credential.clone());
        }

        let session = match connection.session.clone() {
            Some(session) => self.sessions.validate(&credential, session).await?,
            None => {
                info!("No stored session for league {}, logging in", league_id);
                self.sessions.establish(&credential).await?
            }
        };
        if connection.session.as_ref() != Some(&session) {
            patch.session = Some(session.clone());
        }

        if !patch.is_empty() {
            store.merge(league_id, patch).await?;
        }
        Ok(LeagueDataFacade::new(
            self.executor.clone(),
            credential,
            session,
        ))
    }

    /// Runs one export for a stored league.
    #[instrument(skip(self, store, intent))]
    pub async fn export(
        &self,
        store: &dyn LeagueStore,
        league_id: u64,
        intent: ExportIntent,
        context: ExportContext,
    ) -> Result<ExportReport, AppError> {
        let connection = store
            .get(league_id)
            .await?
            .ok_or(AppError::NotConnected { league_id })?;

        let participating: Vec<Destination> = connection
            .destinations
            .values()
            .filter(|destination| destination.participates_in(context))
            .cloned()
            .collect();
        if participating.is_empty() {
            info!(
                "League {} has no destinations for a {:?} export",
                league_id, context
            );
            return Ok(ExportReport {
                league_id,
                ..Default::default()
            });
        }

        let attempt = DestinationStamp {
            last_attempt: Some(Utc::now()),
            last_success: None,
        };
        store
            .merge(
                league_id,
                ConnectionPatch {
                    destination_stamps: stamps_for(&participating, attempt),
                    ..Default::default()
                },
            )
            .await?;

        let facade = self.open_league(store, &connection).await?;
        let platform = connection.credential.platform;
        let result = self
            .run_phases(&facade, platform, league_id, intent, &participating)
            .await;

        // The counter advanced even if a phase failed.
        let mut patch = ConnectionPatch {
            session: Some(facade.current_session()),
            ..Default::default()
        };

        match result {
            Ok(report) => {
                let success = DestinationStamp {
                    last_attempt: None,
                    last_success: Some(Utc::now()),
                };
                patch.destination_stamps = stamps_for(&participating, success);
                store.merge(league_id, patch).await?;
                info!(
                    "Export of league {} finished: {} payloads fetched, {} deliveries",
                    league_id, report.fetched, report.delivered
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Export of league {} failed: {}", league_id, e);
                store.merge(league_id, patch).await?;
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        facade: &LeagueDataFacade,
        platform: Platform,
        league_id: u64,
        intent: ExportIntent,
        destinations: &[Destination],
    ) -> Result<ExportReport, AppError> {
        let info_targets = wanting(destinations, DataCategory::LeagueInfo);
        let weekly_targets = wanting(destinations, DataCategory::WeeklyStats);
        let roster_targets = wanting(destinations, DataCategory::Rosters);

        let needs_hub = matches!(
            intent,
            ExportIntent::CurrentWeek | ExportIntent::SurroundingWeek
        ) || !roster_targets.is_empty();
        let hub = if needs_hub {
            Some(facade.league_hub(league_id).await?)
        } else {
            None
        };
        let weeks = resolve_weeks(intent, hub.as_ref());

        let mut report = ExportReport {
            league_id,
            destinations: destinations.len(),
            weeks: weeks.clone(),
            ..Default::default()
        };

        if !info_targets.is_empty() {
            info!("Fetching league info for league {}", league_id);
            let (teams, standings) =
                try_join(facade.teams(league_id), facade.standings(league_id)).await?;
            let payloads = vec![
                ExportPayload::LeagueTeams(teams),
                ExportPayload::Standings(standings),
            ];
            report.fetched += payloads.len();
            report.delivered += self
                .deliver(&info_targets, platform, league_id, &payloads)
                .await?;
        }

        if !weekly_targets.is_empty() && !weeks.is_empty() {
            info!(
                "Fetching {} weekly datasets across {} weeks",
                weeks.len() * WeeklyDataset::ALL.len(),
                weeks.len()
            );
            let payloads = self.fetch_weeks(facade, league_id, &weeks).await?;
            report.fetched += payloads.len();
            report.delivered += self
                .deliver(&weekly_targets, platform, league_id, &payloads)
                .await?;
        }

        if !roster_targets.is_empty() {
            let team_ids: Vec<u64> = hub
                .map(|hub| {
                    hub.team_id_info_list
                        .iter()
                        .map(|team| team.team_id)
                        .collect()
                })
                .unwrap_or_default();
            self.export_rosters(
                facade,
                platform,
                league_id,
                &team_ids,
                &roster_targets,
                &mut report,
            )
            .await?;
        }

        Ok(report)
    }

    async fn fetch_weeks(
        &self,
        facade: &LeagueDataFacade,
        league_id: u64,
        weeks: &[WeekSelector],
    ) -> Result<Vec<ExportPayload>, AppError> {
        let jitter_max_ms = self.settings.jitter_max_ms;
        let fetches = weeks.iter().flat_map(|week| {
            WeeklyDataset::ALL.into_iter().map(move |dataset| async move {
                tokio::time::sleep(jitter_delay(jitter_max_ms)).await;
                let body = facade.weekly(league_id, dataset, *week).await?;
                Ok::<_, AppError>(ExportPayload::Weekly {
                    week: *week,
                    dataset,
                    body,
                })
            })
        });
        try_join_all(fetches).await
    }

    async fn export_rosters(
        &self,
        facade: &LeagueDataFacade,
        platform: Platform,
        league_id: u64,
        team_ids: &[u64],
        targets: &[Destination],
        report: &mut ExportReport,
    ) -> Result<(), AppError> {
        info!(
            "Exporting {} rosters in groups of {}",
            team_ids.len(),
            self.settings.roster_batch_size
        );

        if team_ids.is_empty() {
            let free_agents = ExportPayload::FreeAgents(facade.free_agents(league_id).await?);
            report.fetched += 1;
            report.delivered += self
                .deliver(targets, platform, league_id, std::slice::from_ref(&free_agents))
                .await?;
            return Ok(());
        }

        for (index, group) in team_ids.chunks(self.settings.roster_batch_size).enumerate() {
            let rosters = try_join_all(group.iter().map(|team_id| async move {
                let body = facade.team_roster(league_id, *team_id).await?;
                Ok::<_, AppError>(ExportPayload::TeamRoster {
                    team_id: *team_id,
                    body,
                })
            }));

            let payloads = if index == 0 {
                let (free_agents, rosters) = try_join(facade.free_agents(league_id), rosters).await?;
                let mut payloads = Vec::with_capacity(rosters.len() + 1);
                payloads.push(ExportPayload::FreeAgents(free_agents));
                payloads.extend(rosters);
                payloads
            } else {
                rosters.await?
            };

            debug!("Roster group {} resolved with {} teams", index + 1, group.len());
            report.fetched += payloads.len();
            report.delivered += self.deliver(targets, platform, league_id, &payloads).await?;
            report.roster_groups.push(group.len());
        }
        Ok(())
    }

    /// Delivers every payload to every target concurrently.
    async fn deliver(
        &self,
        targets: &[Destination],
        platform: Platform,
        league_id: u64,
        payloads: &[ExportPayload],
    ) -> Result<usize, AppError> {
        let deliveries = targets.iter().flat_map(|destination| {
            payloads.iter().map(move |payload| {
                self.sink
                    .deliver(destination, platform, league_id, payload)
            })
        });
        let delivered = try_join_all(deliveries).await?;
        Ok(delivered.len())
    }
}

fn stamps_for(
    destinations: &[Destination],
    stamp: DestinationStamp,
) -> BTreeMap<String, DestinationStamp> {
    destinations
        .iter()
        .map(|destination| (destination.url.clone(), stamp))
        .collect()
}

fn wanting(destinations: &[Destination], category: DataCategory) -> Vec<Destination> {
    destinations
        .iter()
        .filter(|destination| destination.wants(category))
        .cloned()
        .collect()
}

/// Turns an intent into a concrete, duplicate-free week list. Intents that
/// depend on the live calendar need the league hub.
fn resolve_weeks(intent: ExportIntent, hub: Option<&LeagueHub>) -> Vec<WeekSelector> {
    let season_info = hub.map(|hub| &hub.career_hub_info.season_info);
    let weeks = match (intent, season_info) {
        (ExportIntent::CurrentWeek, Some(info)) => vec![current_week(info)],
        (ExportIntent::SurroundingWeek, Some(info)) => surrounding_weeks(info),
        (ExportIntent::CurrentWeek | ExportIntent::SurroundingWeek, None) => Vec::new(),
        (ExportIntent::AllWeeks, _) => all_weeks(),
        (ExportIntent::Weeks(weeks), _) => weeks,
    };

    let mut unique = Vec::with_capacity(weeks.len());
    for week in weeks {
        if !unique.contains(&week) {
            unique.push(week);
        }
    }
    unique
}

fn jitter_delay(jitter_max_ms: u64) -> Duration {
    if jitter_max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=jitter_max_ms))
}
