//! HTTP routes.

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{Method, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::debug;

use super::error::ApiError;
use super::ws;
use crate::chat::RelayHub;
use crate::extract::{FetchError, FetchedPage, PageFetcher};
use crate::gateway::{CompletionGateway, GatewayStats};
use crate::shorten::{ShortenOptions, shorten_with};
use crate::types::{CompletionEvent, Message};
use crate::{HuginnError, Result};

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CompletionGateway>,
    pub hub: Arc<RelayHub>,
    pub fetcher: PageFetcher,
}

/// Build the application router.
///
/// When `static_dir` is set, unmatched paths are served from it.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::any());

    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/fetch-url", post(fetch_url_handler))
        .route("/api/shorten", post(shorten_handler))
        .route("/api/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(cors).with_state(state)
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    chat_history: Vec<Message>,
}

/// Streams the reply as server-sent events.
///
/// The first item is awaited before the response starts, so a failure to
/// establish the completion is still answered with a JSON error and a
/// status code. Later failures arrive as a `data: {"error": ...}` event.
async fn chat_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    let Json(body) = body?;
    let request = state
        .gateway
        .build_request(&body.message, &body.chat_history)?;
    let mut events = state.gateway.complete(request).await?;

    let first = match events.next().await {
        Some(Err(e)) => return Err(e.into()),
        Some(Ok(event)) => Some(Ok(event)),
        None => None,
    };

    let body = stream::iter(first)
        .chain(events)
        .scan(false, |finished, item: Result<CompletionEvent>| {
            if *finished {
                return future::ready(None);
            }
            *finished = !matches!(item, Ok(CompletionEvent::Content(_)));
            future::ready(Some(Ok::<_, Infallible>(sse_event(item))))
        });

    Ok(Sse::new(body).keep_alive(KeepAlive::default()).into_response())
}

fn sse_event(item: Result<CompletionEvent>) -> Event {
    match item {
        Ok(CompletionEvent::Content(content)) => {
            Event::default().data(serde_json::json!({ "content": content }).to_string())
        }
        Ok(CompletionEvent::Done) => Event::default().data("[DONE]"),
        Err(e) => {
            debug!(error = %e, "completion failed mid-stream");
            Event::default().data(serde_json::json!({ "error": e.to_string() }).to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/fetch-url
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FetchUrlRequest {
    #[serde(default)]
    url: Option<String>,
}

async fn fetch_url_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<FetchUrlRequest>, JsonRejection>,
) -> std::result::Result<Json<FetchedPage>, ApiError> {
    let Json(body) = body?;
    let url = body.url.ok_or(HuginnError::Fetch(FetchError::MissingUrl))?;
    let page = state.fetcher.fetch(&url).await.map_err(HuginnError::from)?;
    Ok(Json(page))
}

// ---------------------------------------------------------------------------
// POST /api/shorten
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ShortenRequest {
    text: String,
    #[serde(flatten)]
    options: ShortenOptions,
}

#[derive(Debug, Serialize)]
struct ShortenResponse {
    text: String,
}

async fn shorten_handler(
    body: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> std::result::Result<Json<ShortenResponse>, ApiError> {
    let Json(body) = body?;
    Ok(Json(ShortenResponse {
        text: shorten_with(&body.text, body.options),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/stats, GET /health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(flatten)]
    gateway: GatewayStats,
    queue_length: usize,
    connected_users: usize,
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        gateway: state.gateway.stats(),
        queue_length: state.gateway.pending(),
        connected_users: state.hub.peers(),
    })
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::PKG_VERSION,
    }))
}

// ---------------------------------------------------------------------------
// GET /ws
// ---------------------------------------------------------------------------

async fn ws_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| ws::session(socket, state.hub))
}
