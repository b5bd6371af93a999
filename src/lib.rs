//! Franchise league exporter library
//!
//! This library talks to the console game backend on behalf of a linked
//! league (token refresh, Blaze login, signed requests and bulk exports) and
//! fans league info, weekly stats and rosters out to export destinations.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gridiron_export::error::AppError;
//! use gridiron_export::export::{ExportContext, ExportIntent, ExportScheduler, ExportSettings, HttpDestinationSink};
//! use gridiron_export::store::FileLeagueStore;
//! use gridiron_export::upstream::{RequestExecutor, TokenManager, create_destination_client, create_upstream_client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let client = create_upstream_client(30)?;
//!     let executor = RequestExecutor::new(client.clone(), "https://wal2.tools.gos.bio-iad.ea.com/wal");
//!     let tokens = TokenManager::new(client, "https://accounts.ea.com/connect/token");
//!     let sink = Arc::new(HttpDestinationSink::new(create_destination_client(30)?));
//!     let scheduler = ExportScheduler::new(executor, tokens, sink, ExportSettings::default());
//!
//!     let store = FileLeagueStore::new("/var/lib/gridiron_export");
//!     let report = scheduler
//!         .export(&store, 3_141_592, ExportIntent::CurrentWeek, ExportContext::Manual)
//!         .await?;
//!     println!("{} deliveries", report.delivered);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod logging;
pub mod store;
pub mod testing_utils;
pub mod upstream;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::AppError;
pub use export::{ExportContext, ExportIntent, ExportReport, ExportScheduler, ExportSettings};
pub use store::{FileLeagueStore, LeagueConnection, LeagueStore, MemoryLeagueStore};
pub use upstream::{Credential, LeagueDataFacade, Platform, Session};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
