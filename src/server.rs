use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::config::Settings;
use crate::crawler::{spawn_run, Crawler};
use crate::error::CrawlError;
use crate::query::{self, Page, SearchParams};
use crate::scheduler;

const API_KEY_HEADER: &str = "x-api-key";
/// Upper bound on listing pages a single triggered crawl may walk.
const MAX_TRIGGER_PAGES: u32 = 50;

/// Query pairs as sent. Repeated keys are kept so the first one can win
/// instead of the request being rejected.
type QueryPairs = Query<Vec<(String, String)>>;

#[derive(Clone)]
pub struct AppState {
    store: Arc<CatalogStore>,
    crawler: Arc<Crawler>,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(crawler: Arc<Crawler>, api_key: Option<String>) -> Self {
        Self {
            store: Arc::clone(crawler.store()),
            crawler,
            api_key,
        }
    }
}

pub enum ApiError {
    NotFound(&'static str),
    Unauthorized,
    Internal(String),
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        match e {
            CrawlError::Unauthorized => ApiError::Unauthorized,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/websites", get(list_websites))
        .route("/api/websites/:id", get(get_website))
        .route("/api/palettes", get(list_palettes))
        .route("/api/search", get(search))
        .route("/api/trigger-scrape", post(trigger_scrape))
        .with_state(state)
}

/// Paginated body with the result list under `key`.
fn listing<T: Serialize>(key: &str, page: Page<T>) -> Result<Json<Value>, ApiError> {
    let Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    } = page;
    let mut body = json!({
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": total_pages,
    });
    body[key] = serde_json::to_value(items).map_err(CrawlError::from)?;
    Ok(Json(body))
}

async fn list_websites(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<Value>, ApiError> {
    let entries = state.store.load()?;
    listing("websites", query::list(&entries, &SearchParams::from_pairs(pairs)))
}

async fn get_website(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let entries = state.store.load()?;
    query::find(&entries, &id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("Website not found"))
}

async fn list_palettes(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<Value>, ApiError> {
    let entries = state.store.load()?;
    listing("palettes", query::palettes(&entries, &SearchParams::from_pairs(pairs)))
}

async fn search(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<Value>, ApiError> {
    let entries = state.store.load()?;
    listing("websites", query::search(&entries, &SearchParams::from_pairs(pairs)))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TriggerRequest {
    pages: u32,
    section: String,
}

impl Default for TriggerRequest {
    fn default() -> Self {
        Self {
            pages: 1,
            section: "websites".to_string(),
        }
    }
}

impl TriggerRequest {
    fn pages(&self) -> u32 {
        self.pages.clamp(1, MAX_TRIGGER_PAGES)
    }
}

/// Accepts a crawl request and returns before the crawl starts. Progress is
/// only visible by polling the catalog.
async fn trigger_scrape(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&headers, state.api_key.as_deref())?;

    let req: TriggerRequest = if body.is_empty() {
        TriggerRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_default()
    };
    let pages = req.pages();
    info!(pages, section = %req.section, "Crawl triggered");
    spawn_run(Arc::clone(&state.crawler), pages, req.section);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Scraping initiated" })),
    ))
}

/// The shared secret must be configured and match the request header.
fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), CrawlError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match (expected, provided) {
        (Some(expected), Some(provided)) if expected == provided => Ok(()),
        _ => {
            warn!("Rejected crawl trigger");
            Err(CrawlError::Unauthorized)
        }
    }
}

/// Run the HTTP API (and the daily scheduler, if enabled) until shutdown.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let store = Arc::new(CatalogStore::new(settings.catalog_path()));
    let crawler = Arc::new(Crawler::new(settings, store)?);

    if settings.api_key.is_none() {
        warn!("SHOWCASE_API_KEY is not set; crawl trigger is disabled");
    }
    if settings.initial_scrape {
        info!("Running initial crawl");
        spawn_run(
            Arc::clone(&crawler),
            settings.scrape_pages,
            settings.scrape_section.clone(),
        );
    }
    if settings.scheduled_scraping {
        scheduler::spawn_daily(
            Arc::clone(&crawler),
            settings.scrape_pages,
            settings.scrape_section.clone(),
        );
    }

    let app = router(AppState::new(crawler, settings.api_key.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
