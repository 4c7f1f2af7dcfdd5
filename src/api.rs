// src/api.rs
//! Debug/ops HTTP surface over the shared manager.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::announcement::Announcement;
use crate::error::TrackerError;
use crate::manager::SharedManager;

pub fn router(manager: SharedManager) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/announcements", get(list_announcements))
        .route("/announcements/unposted", get(list_unposted))
        .route("/announcements/next", get(next_announcement))
        .route("/announcements/{id}/posted", post(mark_posted))
        .route("/refresh", post(force_refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(manager)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TrackerError::Fetch(_) => StatusCode::BAD_GATEWAY,
            TrackerError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn list_announcements(
    State(m): State<SharedManager>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    Ok(Json(m.lock().await.announcements(Utc::now()).await?))
}

async fn list_unposted(
    State(m): State<SharedManager>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    Ok(Json(m.lock().await.all_unposted(Utc::now()).await?))
}

/// `null` when nothing is eligible.
async fn next_announcement(
    State(m): State<SharedManager>,
) -> Result<Json<Option<Announcement>>, ApiError> {
    Ok(Json(m.lock().await.random_unposted(Utc::now()).await?))
}

async fn mark_posted(
    State(m): State<SharedManager>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    m.lock().await.mark_posted(&id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct RefreshResp {
    parsed: usize,
    kept: usize,
    duplicates: usize,
    already_posted: usize,
}

async fn force_refresh(State(m): State<SharedManager>) -> Result<Json<RefreshResp>, ApiError> {
    let stats = m.lock().await.force_refresh(Utc::now()).await?;
    Ok(Json(RefreshResp {
        parsed: stats.parsed,
        kept: stats.kept,
        duplicates: stats.duplicates,
        already_posted: stats.carried_posted,
    }))
}
