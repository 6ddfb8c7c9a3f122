use crate::adapters::{DiskBlobStore, MemoryStore, SystemClock};
use crate::auth as auth_service;
use crate::config;
use crate::state;
use crate::sync as sync_service;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

mod auth;
mod notebooks;
mod notes;
mod sync;

pub fn app(config: config::AppConfig) -> Router {
    let auth = auth_service::AuthState::from_config(&config)
        .unwrap_or_else(|err| panic!("invalid auth configuration: {err}"));
    let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
    let blobs = Arc::new(DiskBlobStore::new(config.uploads_dir.clone()));
    let rooms = Arc::new(sync_service::SessionRegistry::new(
        sync_service::DEFAULT_ROOM_CAPACITY,
    ));
    let state = state::AppState {
        config,
        auth,
        store,
        blobs,
        rooms,
    };
    router(state)
}

fn router(state: state::AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload_max_bytes);
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/profile", get(auth::profile))
        .route(
            "/notebooks",
            get(notebooks::notebook_list).post(notebooks::notebook_create),
        )
        .route(
            "/notebooks/{id}",
            get(notebooks::notebook_get)
                .put(notebooks::notebook_update)
                .delete(notebooks::notebook_delete),
        )
        .route("/notes", get(notes::note_list).post(notes::note_create))
        .route(
            "/notes/{id}",
            put(notes::note_update).delete(notes::note_delete),
        )
        .route(
            "/notes/upload-pdf",
            post(notes::upload_pdf).layer(upload_limit),
        )
        .route("/notes/pdf/{filename}", get(notes::serve_pdf))
        .route("/sync", get(sync::sync_upgrade))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorBody>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

pub(crate) fn internal_error() -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    })
}
