use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{ConnectionPatch, LeagueConnection, LeagueStore};
use crate::error::AppError;

const FILE_PREFIX: &str = "league_";
const FILE_SUFFIX: &str = ".json";

/// Stores each connection as a JSON document named `league_<id>.json`.
#[derive(Debug, Clone)]
pub struct FileLeagueStore {
    root: PathBuf,
}

impl FileLeagueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, league_id: u64) -> PathBuf {
        self.root
            .join(format!("{FILE_PREFIX}{league_id}{FILE_SUFFIX}"))
    }

    async fn write_document(&self, connection: &LeagueConnection) -> Result<(), AppError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await?;
        }
        let content = serde_json::to_string_pretty(connection)?;
        let path = self.document_path(connection.league_id);
        let mut file = fs::File::create(&path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        debug!("Wrote league document {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl LeagueStore for FileLeagueStore {
    async fn get(&self, league_id: u64) -> Result<Option<LeagueConnection>, AppError> {
        let path = self.document_path(league_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let connection = serde_json::from_str(&content).map_err(|e| {
            AppError::store_error(format!("Corrupt league document {}: {e}", path.display()))
        })?;
        Ok(Some(connection))
    }

    async fn set(&self, connection: LeagueConnection) -> Result<(), AppError> {
        self.write_document(&connection).await
    }

    async fn merge(&self, league_id: u64, patch: ConnectionPatch) -> Result<(), AppError> {
        let mut connection = self
            .get(league_id)
            .await?
            .ok_or(AppError::NotConnected { league_id })?;
        connection.apply(patch);
        self.write_document(&connection).await
    }

    async fn delete(&self, league_id: u64) -> Result<bool, AppError> {
        match fs::remove_file(self.document_path(league_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<u64>, AppError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_prefix(FILE_PREFIX))
                .and_then(|n| n.strip_suffix(FILE_SUFFIX))
                .and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            ids.push(id);
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::destination::Destination;
    use crate::testing_utils::{sample_credential, sample_session};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_documents_survive_a_new_store_instance() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("leagues");

        let mut connection = LeagueConnection::new(1234, sample_credential());
        connection.add_destination(Destination::new("https://sink.example.com"));
        FileLeagueStore::new(&root).set(connection.clone()).await.unwrap();

        let reopened = FileLeagueStore::new(&root);
        assert_eq!(reopened.get(1234).await.unwrap(), Some(connection));
        assert_eq!(reopened.list().await.unwrap(), vec![1234]);
    }

    #[tokio::test]
    async fn test_merge_only_touches_given_fields() {
        let temp_dir = tempdir().unwrap();
        let store = FileLeagueStore::new(temp_dir.path());
        let mut connection = LeagueConnection::new(5, sample_credential());
        connection.add_destination(Destination::new("https://a.example.com"));
        store.set(connection).await.unwrap();

        let mut destinations = BTreeMap::new();
        destinations.insert(
            "https://b.example.com".to_string(),
            Destination::new("https://b.example.com"),
        );
        store
            .merge(
                5,
                ConnectionPatch {
                    session: Some(sample_session("after-merge")),
                    destinations: Some(destinations),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get(5).await.unwrap().unwrap();
        assert_eq!(stored.credential, sample_credential());
        assert_eq!(stored.session.unwrap().session_key, "after-merge");
        assert_eq!(stored.destinations.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_documents() {
        let temp_dir = tempdir().unwrap();
        let store = FileLeagueStore::new(temp_dir.path());
        assert!(store.get(9).await.unwrap().is_none());
        assert!(!store.delete(9).await.unwrap());
        assert!(matches!(
            store.merge(9, ConnectionPatch::default()).await,
            Err(AppError::NotConnected { league_id: 9 })
        ));

        tokio::fs::write(temp_dir.path().join("league_9.json"), "{not json")
            .await
            .unwrap();
        tokio::fs::write(temp_dir.path().join("notes.txt"), "ignored")
            .await
            .unwrap();
        assert!(matches!(store.get(9).await, Err(AppError::Store(_))));
        assert_eq!(store.list().await.unwrap(), vec![9]);
        assert!(store.delete(9).await.unwrap());
    }
}
