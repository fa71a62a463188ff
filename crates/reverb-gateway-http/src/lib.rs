//! Thin JSON gateway over the echo endpoint set.
//!
//! Exposes each service operation as one route so a browser client can
//! call it directly. The gateway adds no semantics of its own: input
//! validation errors map to 400, everything else to 500, and the
//! streaming endpoint is a WebSocket carrying one JSON request or
//! response per message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use reverb_core::{EchoRequest, ReverbError};
use reverb_service::EchoService;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StatsQuery {
    detailed: bool,
}

#[derive(Deserialize)]
#[serde(default)]
struct HistoryQuery {
    limit: i64,
    offset: i64,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct SearchQuery {
    query: String,
    limit: i64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: 10,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct HealthQuery {
    details: bool,
}

fn error_response(e: ReverbError) -> Response {
    let status = match e {
        ReverbError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
        .into_response()
}

async fn echo(
    State(service): State<Arc<EchoService>>,
    Json(request): Json<EchoRequest>,
) -> Response {
    match service.echo(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

async fn stats(
    State(service): State<Arc<EchoService>>,
    Query(query): Query<StatsQuery>,
) -> Response {
    Json(service.get_stats(query.detailed)).into_response()
}

async fn history(
    State(service): State<Arc<EchoService>>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    Json(service.get_history(query.limit, query.offset)).into_response()
}

async fn history_entry(
    State(service): State<Arc<EchoService>>,
    Path(id): Path<String>,
) -> Response {
    match service.get_history_entry(&id) {
        Some(entry) => Json(entry).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no history entry with id {id}"),
            }),
        )
            .into_response(),
    }
}

async fn search(
    State(service): State<Arc<EchoService>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    Json(service.search_history(&query.query, query.limit)).into_response()
}

async fn clear_history(State(service): State<Arc<EchoService>>) -> StatusCode {
    service.clear_history().await;
    StatusCode::NO_CONTENT
}

async fn health(
    State(service): State<Arc<EchoService>>,
    Query(query): Query<HealthQuery>,
) -> Response {
    Json(service.health_check(query.details).await).into_response()
}

async fn stream_echo(
    State(service): State<Arc<EchoService>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_stream(socket, service))
}

/// Bridges the WebSocket to the service's channel-based stream: each
/// inbound text frame is one request, each outbound frame one response.
/// Closing the socket closes the inbound channel, which ends the session.
async fn run_stream(socket: WebSocket, service: Arc<EchoService>) {
    let (tx, rx) = mpsc::channel::<EchoRequest>(16);
    let mut responses = service.stream_echo(rx);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        use futures::SinkExt;
        while let Some(response) = responses.recv().await {
            let Ok(payload) = serde_json::to_string(&response) else {
                continue;
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<EchoRequest>(&text) {
                Ok(request) => {
                    if tx.send(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => debug!("Ignoring malformed stream frame: {e}"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    drop(tx);
    let _ = writer.await;
}

pub fn router(service: Arc<EchoService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/echo", post(echo))
        .route("/api/echo/stream", get(stream_echo))
        .route("/api/stats", get(stats))
        .route("/api/history", get(history).delete(clear_history))
        .route("/api/history/search", get(search))
        .route("/api/history/:id", get(history_entry))
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(service)
}

pub async fn serve(addr: SocketAddr, service: Arc<EchoService>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP gateway listening on {addr}");
    axum::serve(listener, router(service)).await?;
    Ok(())
}
