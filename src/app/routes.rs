use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::app::library::Library;
use crate::app::sync::{RecentEntry, SyncService, SyncedPreferences};
use crate::reader::{Lesson, LessonSummary};

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub sync: SyncService,
}

/// API routes. Static assets are mounted by the binary as a fallback.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/lessons", get(list_lessons))
        .route("/api/lessons/:id", get(get_lesson))
        .route("/api/learned", get(get_learned).put(put_learned))
        .route("/api/preferences", get(get_preferences).put(put_preferences))
        .route("/api/recents", get(get_recents).put(put_recents))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, StatusCode>;

fn internal(err: anyhow::Error) -> StatusCode {
    tracing::error!(error = %format!("{err:#}"), "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_lessons(State(state): State<AppState>) -> ApiResult<Vec<LessonSummary>> {
    state.library.summaries().await.map(Json).map_err(internal)
}

async fn get_lesson(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Lesson> {
    let id: u64 = id.trim().parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    match state.library.lesson(id).await.map_err(internal)? {
        Some(lesson) => Ok(Json(lesson)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn get_learned(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    state.sync.learned().await.map(Json).map_err(internal)
}

async fn put_learned(
    State(state): State<AppState>,
    Json(ids): Json<Vec<String>>,
) -> ApiResult<Value> {
    state.sync.set_learned(&ids).await.map_err(internal)?;
    tracing::debug!(count = ids.len(), "learned ids replaced");
    Ok(ok())
}

async fn get_preferences(State(state): State<AppState>) -> ApiResult<SyncedPreferences> {
    state.sync.preferences().await.map(Json).map_err(internal)
}

async fn put_preferences(
    State(state): State<AppState>,
    Json(prefs): Json<SyncedPreferences>,
) -> ApiResult<Value> {
    state.sync.set_preferences(&prefs).await.map_err(internal)?;
    Ok(ok())
}

async fn get_recents(State(state): State<AppState>) -> ApiResult<Vec<RecentEntry>> {
    state.sync.recents().await.map(Json).map_err(internal)
}

async fn put_recents(
    State(state): State<AppState>,
    Json(entries): Json<Vec<RecentEntry>>,
) -> ApiResult<Value> {
    state.sync.set_recents(&entries).await.map_err(internal)?;
    Ok(ok())
}
