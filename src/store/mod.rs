pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::race::{Race, RaceId};

pub use rest::RestRaceStore;
pub use sqlite::SqliteRaceStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to race table failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("race table returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid race row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("race {0} not found")]
    NotFound(RaceId),
    #[error("local race table error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no active session; sign in through the hosted auth flow and set RACE_TRACKER_ACCESS_TOKEN")]
    MissingSession,
    #[error("invalid store configuration: {0}")]
    Config(String),
    #[error("local race table lock poisoned")]
    LockPoisoned,
}

/// Remote table of races keyed by an integer id the store assigns.
#[async_trait]
pub trait RaceStore: Send + Sync {
    fn name(&self) -> &str;
    async fn select_all(&self) -> Result<Vec<Race>, StoreError>;
    /// All-or-nothing; returned rows carry store-assigned ids.
    async fn insert(&self, races: Vec<Race>) -> Result<Vec<Race>, StoreError>;
    async fn update(&self, id: RaceId, race: &Race) -> Result<Race, StoreError>;
    async fn delete(&self, id: RaceId) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: RaceStore + ?Sized> RaceStore for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn select_all(&self) -> Result<Vec<Race>, StoreError> {
        (**self).select_all().await
    }

    async fn insert(&self, races: Vec<Race>) -> Result<Vec<Race>, StoreError> {
        (**self).insert(races).await
    }

    async fn update(&self, id: RaceId, race: &Race) -> Result<Race, StoreError> {
        (**self).update(id, race).await
    }

    async fn delete(&self, id: RaceId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}
