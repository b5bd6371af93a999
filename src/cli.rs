use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::export::weeks::WeekSelector;
use crate::upstream::models::Platform;

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Franchise league exporter
///
/// Links a console league through the companion-app login, then pulls
/// league info, weekly stats and rosters from the game backend and posts
/// them to configured export destinations.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// Only log to the log file, not to stdout.
    #[arg(short, long, global = true, help_heading = "Logging")]
    pub quiet: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", global = true, help_heading = "Logging")]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Link a league using an authorization code from the companion-app login
    Connect {
        /// Authorization code returned to the redirect URL
        #[arg(long)]
        code: String,
        /// Console the league lives on (xone, ps4, pc, ps5, xbsx)
        #[arg(long, value_parser = parse_platform)]
        platform: Platform,
        /// League to link. When omitted, the account's leagues are listed instead.
        #[arg(long)]
        league: Option<u64>,
    },

    /// List the leagues visible to a linked league's account
    Leagues {
        #[arg(long)]
        league: u64,
    },

    /// Add or replace an export destination
    AddDestination {
        #[arg(long)]
        league: u64,
        #[arg(long)]
        url: String,
        #[command(flatten)]
        subscriptions: Subscriptions,
    },

    /// Remove an export destination
    RemoveDestination {
        #[arg(long)]
        league: u64,
        #[arg(long)]
        url: String,
    },

    /// Show the export destinations of a league
    ListDestinations {
        #[arg(long)]
        league: u64,
    },

    /// Run an export now
    Export {
        #[arg(long)]
        league: u64,
        #[command(flatten)]
        weeks: WeekChoice,
        /// Only export to destinations with automatic updates enabled
        #[arg(long)]
        auto: bool,
    },

    /// Export the surrounding weeks of every linked league on a timer
    Watch {
        /// Minutes between runs (defaults to the configured interval)
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Forget a linked league
    Disconnect {
        #[arg(long)]
        league: u64,
    },

    /// List current configuration settings
    ListConfig,
}

/// What a destination receives. With no flags given it receives everything.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    /// Receive teams and standings
    #[arg(long)]
    pub league_info: bool,
    /// Receive schedules and weekly stats
    #[arg(long)]
    pub weekly_stats: bool,
    /// Receive team rosters and free agents
    #[arg(long)]
    pub rosters: bool,
    /// Skip this destination in automatic exports
    #[arg(long)]
    pub no_auto_update: bool,
}

impl Subscriptions {
    /// `(league_info, weekly_stats, rosters)` after applying the all-by-default rule
    pub fn categories(&self) -> (bool, bool, bool) {
        if !self.league_info && !self.weekly_stats && !self.rosters {
            return (true, true, true);
        }
        (self.league_info, self.weekly_stats, self.rosters)
    }
}

#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
#[group(multiple = false)]
pub struct WeekChoice {
    /// Export the current week (default)
    #[arg(long)]
    pub current: bool,
    /// Export the previous, current and next week
    #[arg(long)]
    pub surrounding: bool,
    /// Export every week of the season
    #[arg(long)]
    pub all: bool,
    /// Export explicit weeks, e.g. `pre:1,reg:5`
    #[arg(long, value_delimiter = ',', value_parser = parse_week)]
    pub weeks: Vec<WeekSelector>,
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    value.parse().map_err(|e: crate::error::AppError| e.to_string())
}

fn parse_week(value: &str) -> Result<WeekSelector, String> {
    value.parse().map_err(|e: crate::error::AppError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_weeks() {
        let args = Args::parse_from([
            "gridiron_export",
            "export",
            "--league",
            "42",
            "--weeks",
            "pre:1,reg:5",
        ]);
        match args.command {
            Command::Export { league, weeks, auto } => {
                assert_eq!(league, 42);
                assert!(!auto);
                assert_eq!(
                    weeks.weeks,
                    vec![
                        WeekSelector::preseason(0).unwrap(),
                        WeekSelector::season(4).unwrap()
                    ]
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_week_choices_are_exclusive() {
        let result = Args::try_parse_from([
            "gridiron_export",
            "export",
            "--league",
            "1",
            "--all",
            "--current",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_week_is_rejected() {
        let result = Args::try_parse_from([
            "gridiron_export",
            "export",
            "--league",
            "1",
            "--weeks",
            "reg:22",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_connect_parses_platform() {
        let args = Args::parse_from([
            "gridiron_export",
            "--quiet",
            "connect",
            "--code",
            "QUOhAA",
            "--platform",
            "xbsx",
        ]);
        assert!(args.quiet);
        assert_eq!(
            args.command,
            Command::Connect {
                code: "QUOhAA".to_string(),
                platform: Platform::Xbsx,
                league: None,
            }
        );
    }

    #[test]
    fn test_subscriptions_default_to_everything() {
        assert_eq!(Subscriptions::default().categories(), (true, true, true));
        let only_rosters = Subscriptions {
            rosters: true,
            ..Default::default()
        };
        assert_eq!(only_rosters.categories(), (false, false, true));
    }
}
