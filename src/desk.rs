use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::import::{map_grid, parse, ImportError, ImportOptions};
use crate::listing::ListQuery;
use crate::race::{EditForm, Race, RaceId};
use crate::store::{RaceStore, StoreError};

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeskError {
    /// Short message suitable for a blocking alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Import(err) => err.to_string(),
            Self::Store(StoreError::NotFound(id)) => format!("Race {id} no longer exists."),
            Self::Store(StoreError::MissingSession) => {
                "You are signed out. Sign in and try again.".to_string()
            }
            Self::Store(_) => "The race table could not be reached. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub imported_at: DateTime<Utc>,
    pub inserted: Vec<Race>,
    pub total_races: usize,
}

/// Cached race list over a store. The cache is only ever replaced by a full re-fetch.
pub struct RaceDesk<S: RaceStore> {
    store: S,
    races: Vec<Race>,
}

impl<S: RaceStore> RaceDesk<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            races: Vec::new(),
        }
    }

    pub async fn open(store: S) -> Result<Self, DeskError> {
        let mut desk = Self::new(store);
        desk.refresh().await?;
        Ok(desk)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn races(&self) -> &[Race] {
        &self.races
    }

    pub fn get(&self, id: RaceId) -> Option<&Race> {
        self.races.iter().find(|race| race.id == Some(id))
    }

    pub fn view(&self, query: &ListQuery) -> Vec<Race> {
        query.apply(&self.races)
    }

    pub async fn refresh(&mut self) -> Result<(), DeskError> {
        match self.store.select_all().await {
            Ok(races) => {
                self.races = races;
                Ok(())
            }
            Err(err) => {
                error!("error fetching races from {}: {err}", self.store.name());
                Err(err.into())
            }
        }
    }

    /// Parse, map and bulk insert, then re-fetch. Nothing is inserted if any row fails to map.
    pub async fn import_csv(
        &mut self,
        text: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome, DeskError> {
        let grid = parse(text, options.dialect)?;
        let races = map_grid(&grid, options.strategy)?;
        info!(
            "importing {} races ({} dialect, {} strategy)",
            races.len(),
            options.dialect,
            options.strategy
        );
        let inserted = self.store.insert(races).await.map_err(|err| {
            error!("import insert failed: {err}");
            DeskError::from(err)
        })?;
        self.refresh().await?;
        Ok(ImportOutcome {
            imported_at: Utc::now(),
            inserted,
            total_races: self.races.len(),
        })
    }

    pub async fn save_edit(&mut self, id: RaceId, form: &EditForm) -> Result<Race, DeskError> {
        let Some(current) = self.get(id) else {
            error!("error updating race {id}: not in current list");
            return Err(StoreError::NotFound(id).into());
        };
        let next = form.apply_to(current);
        let saved = self.store.update(id, &next).await.map_err(|err| {
            error!("error updating race {id}: {err}");
            DeskError::from(err)
        })?;
        self.refresh().await?;
        Ok(saved)
    }

    pub async fn delete(&mut self, id: RaceId) -> Result<(), DeskError> {
        self.store.delete(id).await.map_err(|err| {
            error!("error deleting race {id}: {err}");
            DeskError::from(err)
        })?;
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::desk::{DeskError, RaceDesk};
    use crate::import::{render_template, ImportOptions, MappingStrategy};
    use crate::listing::{ListQuery, SortDirection, SortState};
    use crate::race::{EditForm, Race, RaceField, RaceId};
    use crate::store::{RaceStore, SqliteRaceStore, StoreError};

    /// Serves reads from an inner table and fails every write.
    struct ReadOnlyStore(SqliteRaceStore);

    #[async_trait]
    impl RaceStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }
        async fn select_all(&self) -> Result<Vec<Race>, StoreError> {
            self.0.select_all().await
        }
        async fn insert(&self, _races: Vec<Race>) -> Result<Vec<Race>, StoreError> {
            Err(StoreError::Status {
                status: 403,
                body: "denied".to_string(),
            })
        }
        async fn update(&self, _id: RaceId, _race: &Race) -> Result<Race, StoreError> {
            Err(StoreError::Status {
                status: 403,
                body: "denied".to_string(),
            })
        }
        async fn delete(&self, _id: RaceId) -> Result<(), StoreError> {
            Err(StoreError::Status {
                status: 403,
                body: "denied".to_string(),
            })
        }
    }

    fn two_row_csv() -> String {
        let template = render_template(MappingStrategy::YearKeyed);
        let headers = template.lines().next().unwrap_or_default();
        format!(
            "{headers}\nIL,HD-48,-12.5,35,35,30,45000,15000,15000,8000,10000\nTX,SD-10,8.2,40,30,30,100,200,300,400,500\n"
        )
    }

    async fn seeded_desk() -> RaceDesk<SqliteRaceStore> {
        let store = SqliteRaceStore::open_in_memory().expect("in-memory table");
        let mut desk = RaceDesk::open(store).await.expect("desk should open");
        desk.import_csv(&two_row_csv(), ImportOptions::default())
            .await
            .expect("import should succeed");
        desk
    }

    #[tokio::test]
    async fn import_inserts_and_refreshes() {
        let desk = seeded_desk().await;
        assert_eq!(desk.races().len(), 2);
        let il = &desk.races()[0];
        assert_eq!(il.id, Some(RaceId(1)));
        assert_eq!(il.dem_performance, -12.5);
        assert_eq!(il.fundraising.total, 93000.0);
        assert_eq!(desk.races()[1].dem_performance, 8.2);
        assert_eq!(desk.races()[1].fundraising.total, 1500.0);
    }

    #[tokio::test]
    async fn failed_mapping_inserts_nothing() {
        let mut desk = seeded_desk().await;
        let bad = format!("{}\nWI,AD-3,1e999\n", two_row_csv().trim_end());
        let err = desk
            .import_csv(&bad, ImportOptions::default())
            .await
            .expect_err("non-finite cell should abort");
        assert!(matches!(err, DeskError::Import(_)));
        assert_eq!(desk.races().len(), 2);
        assert_eq!(desk.store().select_all().await.expect("select").len(), 2);
    }

    #[tokio::test]
    async fn save_edit_recomputes_total_and_refreshes() {
        let mut desk = seeded_desk().await;
        let id = RaceId(2);
        let mut form = EditForm::from_race(desk.get(id).expect("race 2 cached"));
        form.set(RaceField::FundraisingLabor, "1000").expect("labor editable");
        let saved = desk.save_edit(id, &form).await.expect("save should succeed");

        assert_eq!(saved.fundraising.total, 100.0 + 200.0 + 1000.0 + 400.0 + 500.0);
        assert_eq!(desk.get(id).map(|r| r.fundraising.labor), Some(1000.0));
        assert_eq!(desk.get(id).map(|r| r.fundraising.historical.len()), Some(3));
    }

    #[tokio::test]
    async fn delete_removes_after_refetch() {
        let mut desk = seeded_desk().await;
        desk.delete(RaceId(1)).await.expect("delete should succeed");
        let query = ListQuery::new("", SortState::new(RaceField::State, SortDirection::Asc));
        let view = desk.view(&query);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].state, "TX");
    }

    #[tokio::test]
    async fn store_failure_leaves_cache_untouched() {
        let seeded = seeded_desk().await;
        let before = seeded.races().to_vec();
        let mut desk = RaceDesk::open(ReadOnlyStore(seeded.store))
            .await
            .expect("reads still work");

        let form = EditForm::from_race(&before[0]);
        let err = desk
            .save_edit(RaceId(1), &form)
            .await
            .expect_err("write should fail");
        assert_eq!(
            err.user_message(),
            "The race table could not be reached. Please try again."
        );
        assert!(desk.delete(RaceId(1)).await.is_err());
        assert!(desk
            .import_csv(&two_row_csv(), ImportOptions::default())
            .await
            .is_err());
        assert_eq!(desk.races(), before.as_slice());
    }

    #[tokio::test]
    async fn editing_unknown_race_is_not_found() {
        let mut desk = seeded_desk().await;
        let err = desk
            .save_edit(RaceId(77), &EditForm::default())
            .await
            .expect_err("unknown id");
        assert!(matches!(err, DeskError::Store(StoreError::NotFound(RaceId(77)))));
    }

    #[test]
    fn opens_with_blocking_runtime() {
        let store = SqliteRaceStore::open_in_memory().expect("in-memory table");
        let desk = tokio_test::block_on(RaceDesk::open(store)).expect("desk should open");
        assert!(desk.races().is_empty());
    }
}
