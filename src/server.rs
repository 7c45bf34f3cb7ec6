//! JSON HTTP server exposing the session to a browser-based view layer.
//!
//! Everything the view needs — messages, per-kind ingestion status, the
//! attached sources, the suggestion tokens, the active video address — is
//! readable from one `GET /state` call; mutations go through the submit
//! and remove routes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/state` | Full session snapshot |
//! | `POST` | `/chat` | Submit a user message, returns the updated history |
//! | `POST` | `/sources/url` | Submit a URL for a kind (`youtube`, `document`) |
//! | `POST` | `/sources/file` | Multipart upload for a kind (`pdf`, `image`) |
//! | `DELETE` | `/sources/file/{name}` | Remove a file source (idempotent) |
//! | `DELETE` | `/sources/url` | Remove a URL source by address (idempotent) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses follow:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "please enter a valid URL" } }
//! ```
//!
//! Error codes: `bad_request` (400), `conflict` (409, ingestion already
//! pending for the kind), `upstream_failed` (502), `internal` (500).
//! Failures inside the session never surface as panics.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat::ChatError;
use crate::config::Config;
use crate::ingest::IngestError;
use crate::models::{IngestionStatus, Message, Source, SourceKind};
use crate::session::Session;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<Session>,
}

/// Build the router over a session. Exposed separately from
/// [`run_server`] so tests can bind their own listener.
pub fn router(session: Arc<Session>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/state", get(handle_state))
        .route("/chat", post(handle_chat))
        .route("/sources/url", post(handle_submit_url).delete(handle_remove_url))
        .route("/sources/file", post(handle_upload))
        .route("/sources/file/{name}", delete(handle_remove_file))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { session })
}

/// Starts the HTTP server on the configured bind address and serves until
/// the process is terminated.
pub async fn run_server(config: &Config, session: Arc<Session>) -> anyhow::Result<()> {
    let app = router(session);

    println!("Chat API listening on http://{}", config.server.bind);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"conflict"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        if err.is_validation() {
            return AppError::bad_request(err.to_string());
        }
        match err {
            IngestError::AlreadyPending(_) => AppError {
                status: StatusCode::CONFLICT,
                code: "conflict",
                message: err.to_string(),
            },
            _ => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_failed",
                message: err.to_string(),
            },
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

// ============ Request/response shapes ============

#[derive(Serialize)]
struct KindStatus {
    kind: SourceKind,
    pending: bool,
    completed: bool,
}

#[derive(Serialize)]
struct StateResponse {
    session: String,
    messages: Vec<Message>,
    loading: bool,
    statuses: Vec<KindStatus>,
    sources: Vec<Source>,
    suggestions: &'static [&'static str],
    active_video: Option<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct SubmitUrlRequest {
    kind: String,
    url: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    kind: SourceKind,
    status: IngestionStatus,
}

#[derive(Deserialize)]
struct RemoveUrlRequest {
    url: String,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

// ============ Handlers ============

async fn handle_state(State(state): State<AppState>) -> Json<StateResponse> {
    let statuses = state
        .session
        .statuses()
        .into_iter()
        .map(|(kind, status)| KindStatus {
            kind,
            pending: status.pending,
            completed: status.completed,
        })
        .collect();

    Json(StateResponse {
        session: state.session.id().to_string(),
        messages: state.session.messages(),
        loading: state.session.is_loading(),
        statuses,
        sources: state.session.sources(),
        suggestions: state.session.suggestions(),
        active_video: state.session.active_video(),
    })
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<MessagesResponse>, AppError> {
    state.session.send_chat(&req.message).await?;
    Ok(Json(MessagesResponse {
        messages: state.session.messages(),
    }))
}

async fn handle_submit_url(
    State(state): State<AppState>,
    Json(req): Json<SubmitUrlRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let kind: SourceKind = req.kind.parse().map_err(AppError::bad_request)?;
    state.session.submit_url(kind, &req.url).await?;
    Ok(Json(SubmitResponse {
        kind,
        status: state.session.status(kind),
    }))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, AppError> {
    let mut kind: Option<SourceKind> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("kind") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(e.to_string()))?;
                kind = Some(text.parse().map_err(AppError::bad_request)?);
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.to_string()))?;
                file = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| AppError::bad_request("missing 'kind' field"))?;
    let (name, bytes) = file.ok_or_else(|| AppError::bad_request("missing 'file' field"))?;

    state.session.submit_file(kind, &name, bytes).await?;
    Ok(Json(SubmitResponse {
        kind,
        status: state.session.status(kind),
    }))
}

async fn handle_remove_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<RemovedResponse> {
    let removed = state.session.remove_file(&name);
    info!(%name, removed, "file source removal");
    Json(RemovedResponse { removed })
}

async fn handle_remove_url(
    State(state): State<AppState>,
    Json(req): Json<RemoveUrlRequest>,
) -> Json<RemovedResponse> {
    let removed = state.session.remove_url(&req.url);
    info!(url = %req.url, removed, "url source removal");
    Json(RemovedResponse { removed })
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
