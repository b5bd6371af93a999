use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::cli::{Command, Subscriptions, WeekChoice};
use crate::config::Config;
use crate::error::AppError;
use crate::export::destination::{Destination, ExportContext};
use crate::export::http_sink::HttpDestinationSink;
use crate::export::scheduler::{ExportIntent, ExportReport, ExportScheduler};
use crate::store::{ConnectionPatch, FileLeagueStore, LeagueConnection, LeagueStore};
use crate::upstream::executor::RequestExecutor;
use crate::upstream::http_client::{create_destination_client, create_upstream_client};
use crate::upstream::league::LeagueDataFacade;
use crate::upstream::models::{LeagueList, Platform};
use crate::upstream::session::SessionManager;
use crate::upstream::token::TokenManager;

/// Long-lived collaborators shared by every command.
pub struct CommandContext {
    pub config: Config,
    pub store: Arc<dyn LeagueStore>,
    pub executor: RequestExecutor,
    pub tokens: TokenManager,
    pub scheduler: ExportScheduler,
}

impl CommandContext {
    /// Wires the HTTP clients, the file store and the scheduler from config.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let upstream_client = create_upstream_client(config.http_timeout_seconds)?;
        let destination_client = create_destination_client(config.http_timeout_seconds)?;
        let store: Arc<dyn LeagueStore> = Arc::new(FileLeagueStore::new(config.data_dir()));
        Ok(Self::new(
            config,
            store,
            upstream_client,
            destination_client,
        ))
    }

    pub fn new(
        config: Config,
        store: Arc<dyn LeagueStore>,
        upstream_client: reqwest::Client,
        destination_client: reqwest::Client,
    ) -> Self {
        let executor = RequestExecutor::new(upstream_client.clone(), &config.blaze_base_url);
        let tokens = TokenManager::new(upstream_client, &config.token_url);
        let scheduler = ExportScheduler::new(
            executor.clone(),
            tokens.clone(),
            Arc::new(HttpDestinationSink::new(destination_client)),
            config.export_settings(),
        );
        Self {
            config,
            store,
            executor,
            tokens,
            scheduler,
        }
    }
}

/// Dispatches one parsed command.
pub async fn run(context: &CommandContext, command: Command) -> Result<(), AppError> {
    match command {
        Command::Connect {
            code,
            platform,
            league,
        } => handle_connect(context, &code, platform, league).await,
        Command::Leagues { league } => handle_leagues(context, league).await,
        Command::AddDestination {
            league,
            url,
            subscriptions,
        } => handle_add_destination(context, league, url, &subscriptions).await,
        Command::RemoveDestination { league, url } => {
            handle_remove_destination(context, league, &url).await
        }
        Command::ListDestinations { league } => handle_list_destinations(context, league).await,
        Command::Export {
            league,
            weeks,
            auto,
        } => {
            let context_kind = if auto {
                ExportContext::Auto
            } else {
                ExportContext::Manual
            };
            let report = context
                .scheduler
                .export(context.store.as_ref(), league, export_intent(&weeks), context_kind)
                .await?;
            print_report(&report);
            Ok(())
        }
        Command::Watch { interval_minutes } => {
            let minutes = interval_minutes.unwrap_or(context.config.auto_export_interval_minutes);
            handle_watch(context, minutes).await
        }
        Command::Disconnect { league } => handle_disconnect(context, league).await,
        Command::ListConfig => Config::display().await,
    }
}

/// Maps the week flags to an export intent; no flag means the current week.
pub fn export_intent(choice: &WeekChoice) -> ExportIntent {
    if choice.all {
        ExportIntent::AllWeeks
    } else if choice.surrounding {
        ExportIntent::SurroundingWeek
    } else if !choice.weeks.is_empty() {
        ExportIntent::Weeks(choice.weeks.clone())
    } else {
        ExportIntent::CurrentWeek
    }
}

async fn require_connection(
    store: &dyn LeagueStore,
    league_id: u64,
) -> Result<LeagueConnection, AppError> {
    store
        .get(league_id)
        .await?
        .ok_or(AppError::NotConnected { league_id })
}

fn print_leagues(leagues: &LeagueList) {
    println!("\nLeagues");
    println!("────────────────────────────────────");
    if leagues.leagues.is_empty() {
        println!("(none)");
    }
    for league in &leagues.leagues {
        match &league.user_team_name {
            Some(team) => println!("{}  {} ({})", league.league_id, league.league_name, team),
            None => println!("{}  {}", league.league_id, league.league_name),
        }
    }
}

/// Exchanges an authorization code, logs in and stores the chosen league.
/// Existing destinations of a re-linked league are kept.
pub async fn handle_connect(
    context: &CommandContext,
    code: &str,
    platform: Platform,
    league: Option<u64>,
) -> Result<(), AppError> {
    let mut credential = context.tokens.exchange_code(code, platform).await?;
    let login = SessionManager::new(context.executor.clone())
        .login(&credential)
        .await?;
    credential.account_id = login.session.account_numeric_id.to_string();
    if let Some(name) = &login.display_name {
        info!("Signed in as {}", name);
    }

    let facade = LeagueDataFacade::new(context.executor.clone(), credential.clone(), login.session);
    let leagues = facade.leagues().await?;

    let Some(league_id) = league else {
        print_leagues(&leagues);
        println!("\nRun connect again with --league <id> to link one of them.");
        return Ok(());
    };

    if !leagues.leagues.iter().any(|l| l.league_id == league_id) {
        return Err(AppError::config_error(format!(
            "League {league_id} is not visible to this account"
        )));
    }

    let mut connection = match context.store.get(league_id).await? {
        Some(existing) => LeagueConnection {
            credential,
            ..existing
        },
        None => LeagueConnection::new(league_id, credential),
    };
    connection.session = Some(facade.current_session());
    context.store.set(connection).await?;

    info!("Linked league {} on {}", league_id, platform);
    println!("Linked league {league_id} ({platform}).");
    Ok(())
}

pub async fn handle_leagues(context: &CommandContext, league_id: u64) -> Result<(), AppError> {
    let store = context.store.as_ref();
    let connection = require_connection(store, league_id).await?;
    let facade = context.scheduler.open_league(store, &connection).await?;
    let leagues = facade.leagues().await?;
    store
        .merge(
            league_id,
            ConnectionPatch {
                session: Some(facade.current_session()),
                ..Default::default()
            },
        )
        .await?;
    print_leagues(&leagues);
    Ok(())
}

pub async fn handle_add_destination(
    context: &CommandContext,
    league_id: u64,
    url: String,
    subscriptions: &Subscriptions,
) -> Result<(), AppError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "Destination URL must start with http:// or https:// (got '{url}')"
        )));
    }
    let mut connection = require_connection(context.store.as_ref(), league_id).await?;
    if let Some(existing) = connection.destinations.get(&url)
        && !existing.editable
    {
        return Err(AppError::config_error(format!(
            "Destination {url} is managed elsewhere and cannot be edited"
        )));
    }

    let (league_info, weekly_stats, rosters) = subscriptions.categories();
    let destination = Destination {
        league_info,
        weekly_stats,
        rosters,
        auto_update: !subscriptions.no_auto_update,
        ..Destination::new(url.clone())
    };
    connection.add_destination(destination);
    context.store.set(connection).await?;
    println!("Destination {url} saved for league {league_id}.");
    Ok(())
}

pub async fn handle_remove_destination(
    context: &CommandContext,
    league_id: u64,
    url: &str,
) -> Result<(), AppError> {
    let mut connection = require_connection(context.store.as_ref(), league_id).await?;
    match connection.destinations.get(url) {
        None => {
            return Err(AppError::config_error(format!(
                "League {league_id} has no destination {url}"
            )));
        }
        Some(existing) if !existing.editable => {
            return Err(AppError::config_error(format!(
                "Destination {url} is managed elsewhere and cannot be removed"
            )));
        }
        Some(_) => {}
    }
    connection.destinations.remove(url);
    context.store.set(connection).await?;
    println!("Destination {url} removed from league {league_id}.");
    Ok(())
}

pub async fn handle_list_destinations(
    context: &CommandContext,
    league_id: u64,
) -> Result<(), AppError> {
    let connection = require_connection(context.store.as_ref(), league_id).await?;
    println!("\nDestinations for league {league_id}");
    println!("────────────────────────────────────");
    if connection.destinations.is_empty() {
        println!("(none)");
    }
    for destination in connection.destinations.values() {
        let mut subscribed = Vec::new();
        if destination.league_info {
            subscribed.push("league info");
        }
        if destination.weekly_stats {
            subscribed.push("weekly stats");
        }
        if destination.rosters {
            subscribed.push("rosters");
        }
        println!("{}", destination.url);
        println!("  receives: {}", subscribed.join(", "));
        println!(
            "  auto update: {}",
            if destination.auto_update { "yes" } else { "no" }
        );
        let format_time = |time: Option<chrono::DateTime<chrono::Utc>>| {
            time.map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        };
        println!("  last attempt: {}", format_time(destination.last_attempt));
        println!("  last success: {}", format_time(destination.last_success));
        println!("────────────────────────────────────");
    }
    Ok(())
}

pub async fn handle_disconnect(context: &CommandContext, league_id: u64) -> Result<(), AppError> {
    if context.store.delete(league_id).await? {
        println!("League {league_id} unlinked.");
        Ok(())
    } else {
        Err(AppError::NotConnected { league_id })
    }
}

/// Runs an automatic surrounding-week export for every linked league on a
/// fixed interval until Ctrl-C. A failing league is logged and skipped.
pub async fn handle_watch(context: &CommandContext, interval_minutes: u64) -> Result<(), AppError> {
    let period = Duration::from_secs(interval_minutes.max(1) * 60);
    let mut ticker = tokio::time::interval(period);
    info!("Watching linked leagues every {} minutes", interval_minutes.max(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_auto_exports(context).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}

async fn run_auto_exports(context: &CommandContext) -> Result<(), AppError> {
    let store = context.store.as_ref();
    for league_id in store.list().await? {
        match context
            .scheduler
            .export(store, league_id, ExportIntent::SurroundingWeek, ExportContext::Auto)
            .await
        {
            Ok(report) => info!(
                "Automatic export of league {}: {} deliveries",
                league_id, report.delivered
            ),
            Err(e) => error!("Automatic export of league {} failed: {}", league_id, e),
        }
    }
    Ok(())
}

fn print_report(report: &ExportReport) {
    println!("\nExport of league {}", report.league_id);
    println!("────────────────────────────────────");
    if report.destinations == 0 {
        println!("No destinations take part in this export.");
        return;
    }
    let weeks: Vec<String> = report.weeks.iter().map(ToString::to_string).collect();
    println!("Destinations: {}", report.destinations);
    println!(
        "Weeks: {}",
        if weeks.is_empty() {
            "-".to_string()
        } else {
            weeks.join(", ")
        }
    );
    println!("Payloads fetched: {}", report.fetched);
    println!("Deliveries: {}", report.delivered);
    if !report.roster_groups.is_empty() {
        println!("Roster groups: {:?}", report.roster_groups);
    }
}
