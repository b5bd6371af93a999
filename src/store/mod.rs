//! Per-league connection records and the key-value store that holds them.
//!
//! A [`LeagueConnection`] is read at the start of an operation and written
//! back after it. The read-modify-write is not transactional: two exports of
//! the same league at once can both re-login, and the later merge wins.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::export::destination::Destination;
use crate::upstream::models::{Credential, Session};

pub use file::FileLeagueStore;
pub use memory::MemoryLeagueStore;

/// Everything stored for one connected league, keyed by destination URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueConnection {
    pub league_id: u64,
    pub credential: Credential,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,
}

impl LeagueConnection {
    pub fn new(league_id: u64, credential: Credential) -> Self {
        Self {
            league_id,
            credential,
            session: None,
            destinations: BTreeMap::new(),
        }
    }

    pub fn add_destination(&mut self, destination: Destination) {
        self.destinations
            .insert(destination.url.clone(), destination);
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, patch: ConnectionPatch) {
        if let Some(credential) = patch.credential {
            self.credential = credential;
        }
        if let Some(session) = patch.session {
            self.session = Some(session);
        }
        if let Some(destinations) = patch.destinations {
            self.destinations.extend(destinations);
        }
        // Stamps never resurrect a destination removed in the meantime.
        for (url, stamp) in patch.destination_stamps {
            if let Some(destination) = self.destinations.get_mut(&url) {
                if stamp.last_attempt.is_some() {
                    destination.last_attempt = stamp.last_attempt;
                }
                if stamp.last_success.is_some() {
                    destination.last_success = stamp.last_success;
                }
            }
        }
    }
}

/// Export timestamps for one destination. `None` leaves the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestinationStamp {
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

/// Partial update merged into a stored connection. Destinations are merged
/// entry by entry, stamps only touch destinations that still exist, and
/// absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionPatch {
    pub credential: Option<Credential>,
    pub session: Option<Session>,
    pub destinations: Option<BTreeMap<String, Destination>>,
    pub destination_stamps: BTreeMap<String, DestinationStamp>,
}

impl ConnectionPatch {
    pub fn is_empty(&self) -> bool {
        self.credential.is_none()
            && self.session.is_none()
            && self.destinations.is_none()
            && self.destination_stamps.is_empty()
    }
}

#[async_trait]
pub trait LeagueStore: Send + Sync {
    async fn get(&self, league_id: u64) -> Result<Option<LeagueConnection>, AppError>;

    async fn set(&self, connection: LeagueConnection) -> Result<(), AppError>;

    /// Merges a patch into an existing connection. Fails with
    /// [`AppError::NotConnected`] when nothing is stored for the league.
    async fn merge(&self, league_id: u64, patch: ConnectionPatch) -> Result<(), AppError>;

    /// Returns whether a connection was removed.
    async fn delete(&self, league_id: u64) -> Result<bool, AppError>;

    async fn list(&self) -> Result<Vec<u64>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{sample_credential, sample_session};

    #[test]
    fn test_apply_merges_destinations_by_url() {
        let mut connection = LeagueConnection::new(1, sample_credential());
        connection.add_destination(Destination::new("https://a.example.com"));

        let mut updated = Destination::new("https://a.example.com");
        updated.rosters = false;
        let mut destinations = BTreeMap::new();
        destinations.insert(updated.url.clone(), updated);
        destinations.insert(
            "https://b.example.com".to_string(),
            Destination::new("https://b.example.com"),
        );

        connection.apply(ConnectionPatch {
            session: Some(sample_session("k")),
            destinations: Some(destinations),
            ..Default::default()
        });

        assert_eq!(connection.destinations.len(), 2);
        assert!(!connection.destinations["https://a.example.com"].rosters);
        assert_eq!(connection.session.unwrap().session_key, "k");
        assert_eq!(connection.credential, sample_credential());
    }

    #[test]
    fn test_stamps_skip_removed_destinations() {
        let mut connection = LeagueConnection::new(1, sample_credential());
        let kept = Destination::new("https://kept.example.com");
        connection.add_destination(kept.clone());
        let attempt = Utc::now();

        let mut stamps = BTreeMap::new();
        stamps.insert(
            kept.url.clone(),
            DestinationStamp {
                last_attempt: None,
                last_success: Some(attempt),
            },
        );
        stamps.insert(
            "https://removed.example.com".to_string(),
            DestinationStamp {
                last_attempt: Some(attempt),
                last_success: Some(attempt),
            },
        );
        connection.apply(ConnectionPatch {
            destination_stamps: stamps,
            ..Default::default()
        });

        assert_eq!(connection.destinations.len(), 1);
        assert_eq!(connection.destinations[&kept.url].last_success, Some(attempt));
        assert!(connection.destinations[&kept.url].last_attempt.is_none());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ConnectionPatch::default().is_empty());
    }
}
