// src/api.rs
//! HTTP surface: sighting CRUD under `/api` and the live news feed.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde_json::json;
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::{stories::load_stories_default, AppConfig};
use crate::feed::FeedBroadcaster;
use crate::metrics::Metrics;
use crate::sightings::{Sighting, SightingFields, SightingRepository, SqliteSightings};
use crate::Story;

#[derive(Clone)]
pub struct AppState {
    pub sightings: Arc<dyn SightingRepository>,
    pub feed: FeedBroadcaster<Story>,
}

impl AppState {
    pub fn new(sightings: Arc<dyn SightingRepository>, feed: FeedBroadcaster<Story>) -> Self {
        Self { sightings, feed }
    }

    /// SQLite store at `cfg.database_url` plus a feed over the configured
    /// story pool.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let stories = load_stories_default()?;
        let sightings = SqliteSightings::connect(&cfg.database_url).await?;
        Ok(Self::new(
            Arc::new(sightings),
            FeedBroadcaster::new(stories, cfg.feed),
        ))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(err) => {
                error!(target: "api", error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// `{id}` path segment; anything but a UUID is a JSON 400.
struct SightingId(Uuid);

impl<S: Send + Sync> FromRequestParts<S> for SightingId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                debug!(target: "api", reason = %rejection.body_text(), "bad sighting id");
                Err(ApiError::BadRequest("Invalid sighting id"))
            }
        }
    }
}

/// `/health` plus the `/api` routes, with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api", get(list_sightings).post(add_sighting))
        .route("/api/news", get(news_feed))
        .route(
            "/api/{id}",
            get(get_sighting).put(update_sighting).delete(delete_sighting),
        )
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Full application router: [`router`], `/metrics` when enabled, and static
/// assets from `cfg.public_dir` for everything else.
pub fn create_router(state: AppState, cfg: &AppConfig) -> anyhow::Result<Router> {
    let mut app = router(state);
    if cfg.metrics_routes {
        let metrics = Metrics::init(&cfg.feed)?;
        app = app.merge(metrics.router());
    }
    Ok(app.fallback_service(ServeDir::new(&cfg.public_dir)))
}

async fn list_sightings(State(state): State<AppState>) -> Result<Json<Vec<Sighting>>, ApiError> {
    Ok(Json(state.sightings.list().await?))
}

async fn get_sighting(
    State(state): State<AppState>,
    SightingId(id): SightingId,
) -> Result<Json<Sighting>, ApiError> {
    state
        .sightings
        .get(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Sighting not found"))
}

async fn add_sighting(
    State(state): State<AppState>,
    Json(fields): Json<SightingFields>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = state.sightings.create(fields).await?;
    debug!(target: "api", %id, "sighting created");
    Ok(Json(json!({ "uuid": id })))
}

async fn update_sighting(
    State(state): State<AppState>,
    SightingId(id): SightingId,
    Json(fields): Json<SightingFields>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sightings.update(id, fields).await? {
        debug!(target: "api", %id, "update matched no sighting");
    }
    Ok(Json(json!({ "success": true })))
}

async fn delete_sighting(
    State(state): State<AppState>,
    SightingId(id): SightingId,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sightings.delete(id).await? {
        debug!(target: "api", %id, "delete matched no sighting");
    }
    Ok(Json(json!({ "success": true })))
}

/// `GET /api/news`: one subscription per request, closed when the client
/// goes away and axum drops the body stream.
async fn news_feed(State(state): State<AppState>) -> impl IntoResponse {
    let events = state
        .feed
        .subscribe_stream()
        .map(|ev| Event::default().json_data(ev));

    (
        [
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(events),
    )
}
