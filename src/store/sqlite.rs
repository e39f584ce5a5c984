use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::race::{Race, RaceId};
use crate::store::{RaceStore, StoreError};

const RACES_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS races (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    state TEXT NOT NULL,
    district TEXT NOT NULL,
    record_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_races_state_district
    ON races(state, district);
"#;

/// Local race table with store-assigned ids, for development and tests.
pub struct SqliteRaceStore {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteRaceStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, label: String) -> Result<Self, StoreError> {
        conn.execute_batch(RACES_MIGRATION)?;
        Ok(Self {
            conn: Mutex::new(conn),
            label,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn decode_row(id: i64, json: &str) -> Result<Race, StoreError> {
    let mut race: Race = serde_json::from_str(json)?;
    race.id = Some(RaceId(id));
    Ok(race)
}

#[async_trait]
impl RaceStore for SqliteRaceStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn select_all(&self) -> Result<Vec<Race>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, record_json FROM races ORDER BY id")?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|(id, json)| decode_row(*id, json)).collect()
    }

    async fn insert(&self, races: Vec<Race>) -> Result<Vec<Race>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(races.len());
        for race in races {
            let race = race.without_id();
            tx.execute(
                "INSERT INTO races(state, district, record_json) VALUES (?1, ?2, ?3)",
                params![race.state, race.district, serde_json::to_string(&race)?],
            )?;
            let mut stored = race;
            stored.id = Some(RaceId(tx.last_insert_rowid()));
            inserted.push(stored);
        }
        tx.commit()?;
        debug!("inserted {} races into {}", inserted.len(), self.label);
        Ok(inserted)
    }

    async fn update(&self, id: RaceId, race: &Race) -> Result<Race, StoreError> {
        let conn = self.lock()?;
        let stored = race.clone().without_id();
        let changed = conn.execute(
            "UPDATE races SET state = ?1, district = ?2, record_json = ?3 WHERE id = ?4",
            params![
                stored.state,
                stored.district,
                serde_json::to_string(&stored)?,
                id.0
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        let mut saved = stored;
        saved.id = Some(id);
        Ok(saved)
    }

    async fn delete(&self, id: RaceId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM races WHERE id = ?1", params![id.0])?;
        Ok(())
    }
}
