use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, error};

use crate::config::StoreConfig;
use crate::race::{Race, RaceId};
use crate::session::Session;
use crate::store::{RaceStore, StoreError};

const USER_AGENT: &str = concat!("race-tracker/", env!("CARGO_PKG_VERSION"));
const BODY_PREVIEW_CHARS: usize = 180;

/// Race table behind a PostgREST-style endpoint (`{url}/rest/v1/{table}`).
pub struct RestRaceStore {
    client: Client,
    table_url: String,
    api_key: String,
    session: Session,
}

impl RestRaceStore {
    pub fn new(config: &StoreConfig, session: Session) -> Result<Self, StoreError> {
        let base = config.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(StoreError::Config("store url is empty".to_string()));
        }
        if config.table.trim().is_empty() {
            return Err(StoreError::Config("store table is empty".to_string()));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            table_url: format!("{base}/rest/v1/{}", config.table.trim()),
            api_key: config.api_key.clone(),
            session,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .header("Authorization", self.session.bearer())
    }

    fn id_filter(id: RaceId) -> [(&'static str, String); 1] {
        [("id", format!("eq.{id}"))]
    }
}

async fn checked(response: Response, action: &str) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        error!("{action} returned {status}: {preview}");
        return Err(StoreError::Status {
            status: status.as_u16(),
            body: preview,
        });
    }
    Ok(body)
}

fn decode_rows(body: &str) -> Result<Vec<Race>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl RaceStore for RestRaceStore {
    fn name(&self) -> &str {
        &self.table_url
    }

    async fn select_all(&self) -> Result<Vec<Race>, StoreError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows = decode_rows(&checked(response, "select races").await?)?;
        debug!("selected {} races", rows.len());
        Ok(rows)
    }

    async fn insert(&self, races: Vec<Race>) -> Result<Vec<Race>, StoreError> {
        let body = races.into_iter().map(Race::without_id).collect::<Vec<_>>();
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let rows = decode_rows(&checked(response, "insert races").await?)?;
        debug!("inserted {} races", rows.len());
        Ok(rows)
    }

    async fn update(&self, id: RaceId, race: &Race) -> Result<Race, StoreError> {
        let response = self
            .request(Method::PATCH)
            .query(&Self::id_filter(id))
            .header("Prefer", "return=representation")
            .json(&race.clone().without_id())
            .send()
            .await?;
        let rows = decode_rows(&checked(response, "update race").await?)?;
        rows.into_iter().next().ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: RaceId) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE)
            .query(&Self::id_filter(id))
            .send()
            .await?;
        checked(response, "delete race").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};

    use crate::config::StoreConfig;
    use crate::race::{Race, RaceId};
    use crate::session::Session;
    use crate::store::rest::RestRaceStore;
    use crate::store::{RaceStore, StoreError};

    #[derive(Clone, Default)]
    struct MockTable {
        rows: Arc<Mutex<Vec<Race>>>,
    }

    type MockReply = Result<Json<Vec<Race>>, (StatusCode, String)>;

    fn authorize(headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
        let key = headers.get("apikey").and_then(|v| v.to_str().ok());
        let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
        if key == Some("anon") && auth == Some("Bearer jwt") {
            Ok(())
        } else {
            Err((StatusCode::UNAUTHORIZED, "{\"message\":\"JWT invalid\"}".to_string()))
        }
    }

    fn target(params: &HashMap<String, String>) -> Option<i64> {
        params
            .get("id")
            .and_then(|v| v.strip_prefix("eq."))
            .and_then(|v| v.parse().ok())
    }

    async fn select(State(table): State<MockTable>, headers: HeaderMap) -> MockReply {
        authorize(&headers)?;
        Ok(Json(table.rows.lock().unwrap().clone()))
    }

    async fn insert(
        State(table): State<MockTable>,
        headers: HeaderMap,
        Json(body): Json<Vec<Race>>,
    ) -> MockReply {
        authorize(&headers)?;
        let mut rows = table.rows.lock().unwrap();
        let mut inserted = Vec::new();
        for mut race in body {
            assert!(race.id.is_none(), "client must not send ids");
            race.id = Some(RaceId(rows.len() as i64 + 100));
            rows.push(race.clone());
            inserted.push(race);
        }
        Ok(Json(inserted))
    }

    async fn update(
        State(table): State<MockTable>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
        Json(mut body): Json<Race>,
    ) -> MockReply {
        authorize(&headers)?;
        let id = target(&params);
        let mut rows = table.rows.lock().unwrap();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| r.id.map(|i| i.0) == id) {
            body.id = row.id;
            *row = body.clone();
            updated.push(body.clone());
        }
        Ok(Json(updated))
    }

    async fn remove(
        State(table): State<MockTable>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<StatusCode, (StatusCode, String)> {
        authorize(&headers)?;
        let id = target(&params);
        table.rows.lock().unwrap().retain(|r| r.id.map(|i| i.0) != id);
        Ok(StatusCode::NO_CONTENT)
    }

    async fn spawn_mock() -> String {
        let app = Router::new()
            .route(
                "/rest/v1/races",
                get(select).post(insert).patch(update).delete(remove),
            )
            .with_state(MockTable::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock table");
        let addr = listener.local_addr().expect("mock table has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock table stopped");
        });
        format!("http://{addr}")
    }

    fn store_for(url: String, token: &str) -> RestRaceStore {
        let config = StoreConfig {
            url,
            api_key: "anon".to_string(),
            ..StoreConfig::default()
        };
        RestRaceStore::new(&config, Session::from_token(token).unwrap()).unwrap()
    }

    #[test]
    fn builds_table_url_without_double_slash() {
        let store = store_for("https://db.example.co/".to_string(), "jwt");
        assert_eq!(store.table_url(), "https://db.example.co/rest/v1/races");
    }

    #[test]
    fn rejects_empty_url() {
        let config = StoreConfig::default();
        let result = RestRaceStore::new(&config, Session::from_token("jwt").unwrap());
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn crud_round_trip_against_mock_table() {
        let store = store_for(spawn_mock().await, "jwt");

        let mut draft = Race::new("IL", "HD-48");
        draft.id = Some(RaceId(1));
        let inserted = store
            .insert(vec![draft, Race::new("TX", "SD-10")])
            .await
            .expect("insert should succeed");
        assert_eq!(inserted[0].id, Some(RaceId(100)));
        assert_eq!(inserted[1].id, Some(RaceId(101)));

        let mut edited = inserted[1].clone();
        edited.dem_performance = 8.2;
        let saved = store
            .update(RaceId(101), &edited)
            .await
            .expect("update should succeed");
        assert_eq!(saved.id, Some(RaceId(101)));
        assert_eq!(saved.dem_performance, 8.2);

        store.delete(RaceId(100)).await.expect("delete should succeed");
        let rows = store.select_all().await.expect("select should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district, "SD-10");

        let missing = store.update(RaceId(7), &edited).await;
        assert!(matches!(missing, Err(StoreError::NotFound(RaceId(7)))));
    }

    #[tokio::test]
    async fn surfaces_status_errors_with_body_preview() {
        let store = store_for(spawn_mock().await, "expired");
        let err = store.select_all().await.expect_err("bad token should fail");
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("JWT invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
