use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ConnectionPatch, LeagueConnection, LeagueStore};
use crate::error::AppError;

/// Process-local store, used by tests and short-lived runs.
#[derive(Debug, Default)]
pub struct MemoryLeagueStore {
    connections: RwLock<HashMap<u64, LeagueConnection>>,
}

impl MemoryLeagueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeagueStore for MemoryLeagueStore {
    async fn get(&self, league_id: u64) -> Result<Option<LeagueConnection>, AppError> {
        Ok(self.connections.read().await.get(&league_id).cloned())
    }

    async fn set(&self, connection: LeagueConnection) -> Result<(), AppError> {
        self.connections
            .write()
            .await
            .insert(connection.league_id, connection);
        Ok(())
    }

    async fn merge(&self, league_id: u64, patch: ConnectionPatch) -> Result<(), AppError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(&league_id)
            .ok_or(AppError::NotConnected { league_id })?;
        connection.apply(patch);
        Ok(())
    }

    async fn delete(&self, league_id: u64) -> Result<bool, AppError> {
        Ok(self.connections.write().await.remove(&league_id).is_some())
    }

    async fn list(&self) -> Result<Vec<u64>, AppError> {
        let mut ids: Vec<u64> = self.connections.read().await.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{sample_credential, sample_session};

    #[tokio::test]
    async fn test_set_get_merge_delete() {
        let store = MemoryLeagueStore::new();
        assert!(store.get(3).await.unwrap().is_none());

        store
            .set(LeagueConnection::new(3, sample_credential()))
            .await
            .unwrap();
        store
            .merge(
                3,
                ConnectionPatch {
                    session: Some(sample_session("s-1")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get(3).await.unwrap().unwrap();
        assert_eq!(stored.session.unwrap().session_key, "s-1");
        assert_eq!(store.list().await.unwrap(), vec![3]);

        assert!(store.delete(3).await.unwrap());
        assert!(!store.delete(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_unknown_league_fails() {
        let store = MemoryLeagueStore::new();
        let result = store.merge(8, ConnectionPatch::default()).await;
        assert!(matches!(result, Err(AppError::NotConnected { league_id: 8 })));
    }
}
