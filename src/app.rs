#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, Request, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{HeaderValue, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Local;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::chart::{ChartOptions, render_boxplot};
use crate::config::AppConfig;
use crate::downloader::{ExportFormat, export_filename};
use crate::error::{AppError, AppResult};
use crate::graph::{ClearOutcome, GraphStats, GraphStore, SearchHits, build_graph, sample_graph};
use crate::loader;
use crate::pages::Pages;
use crate::search::search_table;
use crate::stats::{SummaryRecord, describe, preview};
use crate::store::{DataStore, Dataset};
use crate::upload::{self, UploadedFile};

/// Rows returned by `GET /api/data`
pub const API_DATA_LIMIT: usize = 100;

pub struct AppState {
    pub config: AppConfig,
    pub store: DataStore,
    pub graphs: GraphStore,
    pub pages: Pages,
}

impl AppState {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let graphs = GraphStore::new(&config.graph_path, &config.backup_dir);
        Ok(AppState {
            config,
            store: DataStore::new(),
            graphs,
            pages: Pages::new()?,
        })
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct DownloadQuery {
    format: Option<String>,
}

#[derive(Deserialize)]
struct GraphSearchRequest {
    #[serde(default)]
    query: String,
}

/// Build the application router around `state`
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_content_length;
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/status", get(status))
        .route("/upload", post(upload_page))
        .route("/api/upload", post(upload_api))
        .route("/analysis", get(serve_analysis))
        .route("/search", get(serve_search))
        .route("/download", get(download))
        .route("/api/data", get(get_data))
        .route("/api/summary", get(get_summary))
        .route("/api/graph", get(get_graph))
        .route("/api/search", post(search_graph))
        .route("/api/data/clear", post(clear_data))
        .route("/api/data/stats", get(get_graph_stats))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Ensure required directories exist
    fs::create_dir_all(&config.upload_folder)?;
    fs::create_dir_all(&config.backup_dir)?;
    if let Some(parent) = config.graph_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    response
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

/// Map an error on an HTML route to a response
///
/// Missing data sends the browser back to the upload page; anything else
/// re-renders the upload page with the user-safe message.
fn page_error(state: &AppState, err: AppError) -> Response {
    if let AppError::NotFound(_) = err {
        return Redirect::to("/").into_response();
    }

    let status = err.status_code();
    if status.is_server_error() {
        error!("{}", err);
    } else {
        warn!("{}", err);
    }

    let message = err.public_message();
    let current = state.store.snapshot();
    match state.pages.index(
        current.as_ref().map(|d| &d.summary),
        &state.config.allowed_extensions,
        Some(&message),
    ) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render error page: {}", e);
            (status, message).into_response()
        }
    }
}

fn page(state: &AppState, rendered: AppResult<String>) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => page_error(state, e),
    }
}

/// Pull the `file` field out of a multipart body
async fn read_upload(mut multipart: Multipart) -> AppResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?.to_vec();
            return Ok(UploadedFile { filename, bytes });
        }
    }
    Err(AppError::Validation("No file provided".to_string()))
}

/// Validate, save and parse an upload
///
/// The result is not made current here; callers swap it into the store only
/// once everything else the upload produces has succeeded.
fn ingest(state: &AppState, file: &UploadedFile, keep_file: bool) -> AppResult<Dataset> {
    let path = upload::save_upload(
        &state.config.upload_folder,
        file,
        &state.config.allowed_extensions,
    )?;

    let parsed = loader::load_table(&path);
    if !keep_file {
        if let Err(e) = fs::remove_file(&path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
    let table = parsed?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let summary = SummaryRecord::from_table(&filename, &table, Local::now());
    info!(
        "Loaded {}: {} rows, {} columns",
        summary.filename, summary.rows, summary.columns
    );

    Ok(Dataset { table, summary })
}

async fn ingest_blocking(
    state: SharedState,
    file: UploadedFile,
    keep_file: bool,
) -> AppResult<Dataset> {
    tokio::task::spawn_blocking(move || ingest(&state, &file, keep_file))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

async fn serve_index(State(state): State<SharedState>) -> Response {
    let current = state.store.snapshot();
    let rendered = state.pages.index(
        current.as_ref().map(|d| &d.summary),
        &state.config.allowed_extensions,
        None,
    );
    page(&state, rendered)
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({
        "message": "SheetScope API",
        "status": "running",
        "timestamp": Local::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn check_writable_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    if fs::metadata(dir)?.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{} is read-only", dir.display()),
        ));
    }
    Ok(())
}

async fn health_check(State(state): State<SharedState>) -> Response {
    let timestamp = Local::now().to_rfc3339();
    match check_writable_dir(&state.config.upload_folder) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": timestamp,
                "version": env!("CARGO_PKG_VERSION"),
                "checks": { "filesystem": "ok" },
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "timestamp": timestamp,
                    "error": "upload directory unavailable",
                })),
            )
                .into_response()
        }
    }
}

async fn upload_page(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok(file) => ingest_blocking(state.clone(), file, true).await,
            Err(e) => Err(e),
        },
        Err(rejection) => Err(rejection.into()),
    };

    match result {
        Ok(dataset) => {
            state.store.replace(dataset);
            Redirect::to("/analysis").into_response()
        }
        Err(e) => page_error(&state, e),
    }
}

async fn upload_api(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let file = read_upload(multipart?).await?;
    let dataset = ingest_blocking(state.clone(), file, false).await?;

    let graph = build_graph(&dataset.table);
    state.graphs.save(&graph)?;
    let dataset = state.store.replace(dataset);

    Ok(Json(json!({
        "success": true,
        "message": "File processed successfully",
        "summary": dataset.summary,
        "graph_data": graph,
    })))
}

fn render_analysis(state: &AppState) -> AppResult<String> {
    let dataset = state.store.require()?;
    let stats = describe(&dataset.table);
    let chart = render_boxplot(&dataset.table, &ChartOptions::default());

    state.pages.analysis(
        &dataset.summary,
        &preview(&dataset.table),
        &stats,
        chart.as_ref(),
    )
}

async fn serve_analysis(State(state): State<SharedState>) -> Response {
    let rendered = render_analysis(&state);
    page(&state, rendered)
}

fn render_search(state: &AppState, query: &str) -> AppResult<String> {
    let dataset = state.store.require()?;
    let matches = search_table(&dataset.table, query);
    state
        .pages
        .search(&dataset.summary.filename, query.trim(), &matches)
}

async fn serve_search(
    State(state): State<SharedState>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let rendered = render_search(&state, params.q.as_deref().unwrap_or_default());
    page(&state, rendered)
}

fn export(state: &AppState, format: Option<&str>) -> AppResult<Response> {
    let dataset = state.store.require()?;
    let format = ExportFormat::parse(format)?;
    let body = format.render(&dataset.table)?;
    let filename = export_filename(format, Local::now());

    info!("Exporting {} rows as {}", dataset.table.row_count(), filename);
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

async fn download(
    State(state): State<SharedState>,
    Query(params): Query<DownloadQuery>,
) -> Response {
    export(&state, params.format.as_deref()).unwrap_or_else(|e| page_error(&state, e))
}

async fn get_data(
    State(state): State<SharedState>,
) -> AppResult<Json<Vec<serde_json::Map<String, serde_json::Value>>>> {
    let dataset = state.store.require()?;
    Ok(Json(dataset.table.records(API_DATA_LIMIT)))
}

async fn get_summary(State(state): State<SharedState>) -> AppResult<Json<serde_json::Value>> {
    let dataset = state.store.require()?;
    Ok(Json(json!({
        "summary": dataset.summary,
        "statistics": describe(&dataset.table),
    })))
}

async fn get_graph(State(state): State<SharedState>) -> AppResult<Response> {
    Ok(match state.graphs.load()? {
        Some(doc) => (
            [(header::CACHE_CONTROL, "public, max-age=300")],
            Json(doc),
        )
            .into_response(),
        None => Json(sample_graph()).into_response(),
    })
}

async fn search_graph(
    State(state): State<SharedState>,
    request: Result<Json<GraphSearchRequest>, JsonRejection>,
) -> AppResult<Json<SearchHits>> {
    let Json(request) = request?;
    Ok(Json(state.graphs.search(&request.query)?))
}

async fn clear_data(State(state): State<SharedState>) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(match state.graphs.clear()? {
        ClearOutcome::BackedUp(backup) => json!({
            "success": true,
            "message": "Data cleared",
            "backup": backup.display().to_string(),
        }),
        ClearOutcome::NothingToClear => json!({
            "success": true,
            "message": "No data to clear",
        }),
    }))
}

async fn get_graph_stats(State(state): State<SharedState>) -> AppResult<Json<GraphStats>> {
    Ok(Json(state.graphs.stats()?))
}

async fn not_found(State(state): State<SharedState>, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Endpoint not found" })),
        )
            .into_response();
    }
    serve_index(State(state)).await
}
