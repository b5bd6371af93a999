pub mod auth_codec;
pub mod executor;
pub mod http_client;
pub mod league;
pub mod models;
pub mod request;
pub mod session;
pub mod token;
pub mod urls;

// Re-export URL utilities
pub use urls::*;
// Re-export HTTP client utilities
pub use http_client::{create_destination_client, create_upstream_client};

pub use auth_codec::MessageAuth;
pub use executor::{RequestExecutor, strip_control_characters};
pub use league::{LeagueDataFacade, WeeklyDataset};
pub use models::{Credential, LeagueHub, LeagueList, Platform, Session};
pub use request::{ExportParams, Request, RequestPayload};
pub use session::{LoginDetails, SessionManager};
pub use token::TokenManager;
