use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::loader::UploadedFile;
use crate::router::{DashboardState, ParsedBatch, ReportFamily};
use crate::tags::Region;
use crate::views::{self, RollupLevel};

pub struct AppState {
    dashboard: Mutex<DashboardState>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            dashboard: Mutex::new(DashboardState::new()),
        }
    }

    // a panic while holding the lock cannot leave a half-committed batch
    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.dashboard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ViewQuery {
    by: Option<String>,
    region: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Routes without the static fallback, for tests and embedding.
pub fn api_router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/state", get(get_state).delete(clear_state))
        .route("/api/files/:family", get(get_family))
        .route("/api/views/shipment", get(shipment_view))
        .route("/api/views/scanning", get(scanning_view))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .with_state(state)
}

pub fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    api_router(state, config)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = Arc::new(AppState::new());
    let app = build_router(app_state, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!(
        "listening on http://{} (static files from {})",
        config.bind_addr,
        config.static_dir.display()
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("malformed upload: {e}")),
        };
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        match field.bytes().await {
            Ok(bytes) => files.push(UploadedFile::new(name, bytes.to_vec())),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("reading '{name}': {e}")),
        }
    }

    if files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no files in upload");
    }
    log::info!("upload of {} file(s)", files.len());

    // parse off the async runtime, then commit under one lock
    let parsed = tokio::task::spawn_blocking(move || ParsedBatch::parse(&files)).await;
    let batch: ParsedBatch = match parsed {
        Ok(batch) => batch,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("upload failed: {e}")),
    };
    let report = state.lock().commit(batch);

    Json(report).into_response()
}

async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.lock().overview())
}

async fn clear_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.lock().clear();
    StatusCode::NO_CONTENT
}

async fn get_family(Path(family): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let family: ReportFamily = match family.parse() {
        Ok(family) => family,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e),
    };
    match state.lock().family_json(family) {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn parse_view_query(query: &ViewQuery) -> Result<(RollupLevel, Region), Response> {
    let level = match &query.by {
        Some(by) => by
            .parse()
            .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?,
        None => RollupLevel::Region,
    };
    let region = match &query.region {
        Some(region) => region
            .parse()
            .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?,
        None => Region::All,
    };
    Ok((level, region))
}

async fn shipment_view(Query(query): Query<ViewQuery>, State(state): State<Arc<AppState>>) -> Response {
    let (level, region) = match parse_view_query(&query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    let dashboard = state.lock();
    let rows = dashboard
        .summary_data()
        .into_iter()
        .filter(|r| r.tags.region.applies_to(region))
        .map(|r| &r.row);
    Json(serde_json::json!({
        "by": level,
        "region": region,
        "rows": views::shipment_rollup(rows, level),
        "regionTotals": views::region_total_for(&dashboard.region_totals(), region),
    }))
    .into_response()
}

async fn scanning_view(Query(query): Query<ViewQuery>, State(state): State<Arc<AppState>>) -> Response {
    let (level, region) = match parse_view_query(&query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    let dashboard = state.lock();
    let files = views::files_for_region(&dashboard.scanning_files, region);
    let rows = files.into_iter().flat_map(|f| f.stores.iter().map(|r| &r.row));
    Json(serde_json::json!({
        "by": level,
        "region": region,
        "rows": views::scanning_rollup(rows, level),
    }))
    .into_response()
}
