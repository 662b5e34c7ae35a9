//! HTTP API gateway for Blotter.
//!
//! Exposes the conversational surface over REST: a health check, a
//! request/response chat endpoint, and an NDJSON streaming variant
//! that forwards dispatch events as they happen.
//!
//! Built on Axum.

use axum::body::Body;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use blotter_core::event::{DomainEvent, EventBus};
use blotter_core::message::{ConversationId, IncomingMessage};
use blotter_dispatch::Dispatcher;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub events: Arc<EventBus>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: &blotter_config::GatewayConfig,
    state: SharedState,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing conversation ID (omit to create new).
    #[serde(default)]
    conversation_id: Option<String>,
    /// The user's message.
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    conversation_id: String,
    handler: String,
    response: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    info!(message_len = payload.message.len(), "chat request");

    let mut incoming = IncomingMessage::new(&payload.message);
    incoming.conversation_id = payload.conversation_id;

    let outcome = state.dispatcher.dispatch(incoming).await;
    Json(ChatResponse {
        conversation_id: outcome.conversation_id.to_string(),
        handler: outcome.handler,
        response: outcome.reply.text,
        success: outcome.reply.success,
        data: outcome.reply.data,
    })
}

/// One NDJSON frame on the streaming endpoint.
#[derive(Serialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    frame_type: &'static str,
    agent: String,
    data: serde_json::Value,
    timestamp: chrono::DateTime<Utc>,
}

impl StreamFrame {
    fn now(frame_type: &'static str, agent: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            frame_type,
            agent: agent.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    fn from_event(event: &DomainEvent, conversation: &str) -> Option<Self> {
        match event {
            DomainEvent::HandlerAssigned {
                conversation_id,
                handler,
                timestamp,
            } if conversation_id.as_str() == conversation => Some(Self {
                frame_type: "agent_assigned",
                agent: handler.clone(),
                data: serde_json::json!({ "conversation_id": conversation_id }),
                timestamp: *timestamp,
            }),
            DomainEvent::ErrorOccurred {
                context,
                error_message,
                timestamp,
            } => Some(Self {
                frame_type: "error",
                agent: context.clone(),
                data: serde_json::json!({ "message": error_message }),
                timestamp: *timestamp,
            }),
            _ => None,
        }
    }
}

/// `POST /chat/stream` — dispatch the message while streaming NDJSON
/// frames: `agent_assigned` when a handler is chosen, `error` frames
/// as they occur, and a final `agent_response` with the reply.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let conversation_id = payload
        .conversation_id
        .map(|id| ConversationId::from(id.as_str()))
        .unwrap_or_default();

    let mut incoming = IncomingMessage::new(&payload.message);
    incoming.conversation_id = Some(conversation_id.to_string());

    // Subscribe before dispatching so no frame is missed.
    let mut events = state.events.subscribe();
    let dispatcher = state.dispatcher.clone();
    let (tx, rx) = tokio::sync::mpsc::channel::<StreamFrame>(16);

    tokio::spawn(async move {
        let conversation = conversation_id.to_string();
        let dispatch = dispatcher.dispatch(incoming);
        tokio::pin!(dispatch);

        let outcome = loop {
            tokio::select! {
                outcome = &mut dispatch => break outcome,
                event = events.recv() => {
                    if let Ok(event) = event {
                        if let Some(frame) = StreamFrame::from_event(&event, &conversation) {
                            if tx.send(frame).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        };

        // Drain events that raced with dispatch completion.
        while let Ok(event) = events.try_recv() {
            if let Some(frame) = StreamFrame::from_event(&event, &conversation) {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
        }

        let _ = tx
            .send(StreamFrame::now(
                "agent_response",
                outcome.handler,
                serde_json::json!({
                    "conversation_id": outcome.conversation_id.to_string(),
                    "response": outcome.reply.text,
                    "success": outcome.reply.success,
                    "data": outcome.reply.data,
                }),
            ))
            .await;
    });

    let stream = ReceiverStream::new(rx).map(|frame| {
        let line = serde_json::to_string(&frame).unwrap_or_default();
        Ok::<_, std::convert::Infallible>(format!("{line}\n"))
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use blotter_core::CompletionProvider;
    use blotter_dispatch::ContextStore;
    use blotter_handlers::{
        HandlerDeps, NullCalendarClient, NullEmailSender, NullQuoteClient, standard_routes,
    };
    use blotter_ledger::CsvLedger;
    use blotter_providers::FeatureHashEmbedder;
    use blotter_retrieval::{Chunker, Indexer, RetrievalEngine, standard_collections};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> SharedState {
        let config = blotter_config::AppConfig::default();
        let provider: Arc<dyn CompletionProvider> = Arc::new(FeatureHashEmbedder::new(64));
        let engine = Arc::new(RetrievalEngine::new(
            provider.clone(),
            standard_collections(64),
            &config.retrieval,
        ));
        let events = Arc::new(EventBus::default());
        let (routes, fallback) = standard_routes(HandlerDeps {
            provider: provider.clone(),
            ledger: Arc::new(CsvLedger::new(dir.path().join("blotter.csv"))),
            engine,
            indexer: Arc::new(Indexer::new(provider, Chunker::default())),
            email: Arc::new(NullEmailSender),
            calendar: Arc::new(NullCalendarClient::new()),
            quotes: Arc::new(NullQuoteClient),
            idk_message: config.retrieval.idk_message.clone(),
            events: Some(events.clone()),
        });
        let store = Arc::new(ContextStore::new(&config.context));
        let dispatcher =
            Arc::new(Dispatcher::new(store, routes, fallback).with_events(events.clone()));
        Arc::new(GatewayState { dispatcher, events })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({ "message": "hello", "conversation_id": "c1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["handler"], "smalltalk");
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn chat_without_conversation_id_creates_one() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({ "message": "show the ledger" }),
            ))
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(!json["conversation_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_emits_assignment_then_response() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let response = app
            .oneshot(post_json(
                "/chat/stream",
                serde_json::json!({
                    "message": "log a trade for Alice Johnson bought 100 shares of TSLA",
                    "conversation_id": "c2"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let frames: Vec<serde_json::Value> = std::str::from_utf8(&body)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let types: Vec<&str> = frames
            .iter()
            .map(|f| f["type"].as_str().unwrap())
            .collect();
        assert!(types.contains(&"agent_assigned"));
        assert_eq!(*types.last().unwrap(), "agent_response");

        let last = frames.last().unwrap();
        assert_eq!(last["agent"], "trade_log");
        assert_eq!(last["data"]["success"], true);
    }

    #[tokio::test]
    async fn stream_surfaces_handler_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        // No market data feed is configured, so the handler errors.
        let response = app
            .oneshot(post_json(
                "/chat/stream",
                serde_json::json!({ "message": "what's the TSLA price", "conversation_id": "c3" }),
            ))
            .await
            .unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let frames: Vec<serde_json::Value> = std::str::from_utf8(&body)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let types: Vec<&str> = frames
            .iter()
            .map(|f| f["type"].as_str().unwrap())
            .collect();
        assert!(types.contains(&"error"));
        assert_eq!(frames.last().unwrap()["data"]["success"], false);
    }
}
