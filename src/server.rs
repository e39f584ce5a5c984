use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::desk::{DeskError, ImportOutcome, RaceDesk};
use crate::import::{
    parse, preview, render_template, CsvDialect, ImportOptions, ImportPreview, MappingStrategy,
    TEMPLATE_FILE_NAME,
};
use crate::listing::{ListQuery, SortDirection, SortState};
use crate::race::{EditForm, Race, RaceField, RaceId};
use crate::store::{RaceStore, StoreError};

type SharedDesk = Arc<Mutex<RaceDesk<Box<dyn RaceStore>>>>;

#[derive(Clone)]
struct ApiState {
    desk: SharedDesk,
    import: ImportOptions,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(id: RaceId) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("Race {id} no longer exists."),
        }
    }
}

impl From<DeskError> for ApiError {
    fn from(error: DeskError) -> Self {
        let status = match &error {
            DeskError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DeskError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            DeskError::Store(StoreError::MissingSession) => StatusCode::UNAUTHORIZED,
            DeskError::Store(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
struct ListParams {
    search: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
    #[serde(default)]
    refresh: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ImportParams {
    dialect: Option<String>,
    strategy: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    store: String,
    races: usize,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    query: ListQuery,
    races: Vec<Race>,
}

pub fn router(desk: RaceDesk<Box<dyn RaceStore>>, import: ImportOptions) -> Router {
    let state = ApiState {
        desk: Arc::new(Mutex::new(desk)),
        import,
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/races", get(list_races))
        .route(
            "/v1/races/:id",
            get(show_race).put(update_race).delete(delete_race),
        )
        .route("/v1/races/import", post(import_races))
        .route("/v1/races/import/preview", post(preview_import))
        .route("/v1/template", get(template))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(
    desk: RaceDesk<Box<dyn RaceStore>>,
    import: ImportOptions,
    bind: SocketAddr,
) -> Result<()> {
    let app = router(desk, import);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("race API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<ApiState>) -> Json<ApiResponse<HealthResponse>> {
    let desk = state.desk.lock().await;
    ok(HealthResponse {
        status: "ok",
        store: desk.store().name().to_string(),
        races: desk.races().len(),
    })
}

async fn list_races(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse> {
    let query = parse_list_query(&params)?;
    let mut desk = state.desk.lock().await;
    if params.refresh {
        desk.refresh().await?;
    }
    let races = desk.view(&query);
    Ok(ok(ListResponse { query, races }))
}

async fn show_race(State(state): State<ApiState>, Path(id): Path<i64>) -> ApiResult<Race> {
    let id = RaceId(id);
    let desk = state.desk.lock().await;
    let race = desk.get(id).cloned().ok_or_else(|| ApiError::not_found(id))?;
    Ok(ok(race))
}

async fn update_race(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(form): Json<EditForm>,
) -> ApiResult<Race> {
    let mut desk = state.desk.lock().await;
    let saved = desk.save_edit(RaceId(id), &form).await?;
    Ok(ok(saved))
}

async fn delete_race(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<RaceId> {
    let mut desk = state.desk.lock().await;
    desk.delete(RaceId(id)).await?;
    Ok(ok(RaceId(id)))
}

async fn import_races(
    State(state): State<ApiState>,
    Query(params): Query<ImportParams>,
    body: String,
) -> ApiResult<ImportOutcome> {
    let options = resolve_import_options(state.import, &params)?;
    let mut desk = state.desk.lock().await;
    let outcome = desk.import_csv(&body, options).await?;
    Ok(ok(outcome))
}

async fn preview_import(
    State(state): State<ApiState>,
    Query(params): Query<ImportParams>,
    body: String,
) -> ApiResult<ImportPreview> {
    let options = resolve_import_options(state.import, &params)?;
    let grid = parse(&body, options.dialect).map_err(DeskError::from)?;
    let preview = preview(&grid, options.strategy).map_err(DeskError::from)?;
    Ok(ok(preview))
}

async fn template(
    State(state): State<ApiState>,
    Query(params): Query<ImportParams>,
) -> std::result::Result<Response, ApiError> {
    let options = resolve_import_options(state.import, &params)?;
    let disposition = format!("attachment; filename=\"{TEMPLATE_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_template(options.strategy),
    )
        .into_response())
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn parse_list_query(params: &ListParams) -> std::result::Result<ListQuery, ApiError> {
    let field = params
        .sort
        .as_deref()
        .map(RaceField::from_str)
        .transpose()
        .map_err(|error| ApiError::bad_request(error.to_string()))?
        .unwrap_or(RaceField::State);
    let direction = params
        .direction
        .as_deref()
        .map(SortDirection::from_str)
        .transpose()
        .map_err(|error| ApiError::bad_request(error.to_string()))?
        .unwrap_or_default();
    Ok(ListQuery::new(
        params.search.clone().unwrap_or_default(),
        SortState::new(field, direction),
    ))
}

fn resolve_import_options(
    defaults: ImportOptions,
    params: &ImportParams,
) -> std::result::Result<ImportOptions, ApiError> {
    let dialect = params
        .dialect
        .as_deref()
        .map(CsvDialect::from_str)
        .transpose()
        .map_err(|error| ApiError::bad_request(error.to_string()))?
        .unwrap_or(defaults.dialect);
    let strategy = params
        .strategy
        .as_deref()
        .map(MappingStrategy::from_str)
        .transpose()
        .map_err(|error| ApiError::bad_request(error.to_string()))?
        .unwrap_or(defaults.strategy);
    Ok(ImportOptions { dialect, strategy })
}
