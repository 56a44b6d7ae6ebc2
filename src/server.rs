use axum::{
    extract::State,
    http::StatusCode,
    response::Json as JsonResponse,
    routing::{get, post},
    serve, Router,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::core::{Enhancer, EnhancerStatus, StatusSnapshot};
use crate::coordinator::ApplyOutcome;
use crate::deck::FileDeck;
use crate::theme::analyze_theme;

// App state
pub struct AppState {
    pub enhancer: Enhancer,
    pub app_start_time: DateTime<Utc>,
}

type ApiError = (StatusCode, JsonResponse<Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        JsonResponse(json!({ "error": message.into() })),
    )
}

// Request structs
#[derive(Deserialize)]
struct DeckRequest {
    path: String,
}

#[derive(Deserialize)]
struct TranscriptRequest {
    text: String,
}

#[derive(Deserialize)]
struct GenerateRequest {
    topic: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub status_code: u16,
    pub enhancer_status: EnhancerStatus,
    pub message: String,
    pub deck_selected: bool,
    pub deck: Option<String>,
    pub buffered_utterances: usize,
    pub uptime_secs: i64,
}

async fn health_check(State(state): State<Arc<AppState>>) -> JsonResponse<HealthCheckResponse> {
    let snapshot = state.enhancer.status();
    JsonResponse(HealthCheckResponse {
        status: "ok".to_string(),
        status_code: 200,
        enhancer_status: snapshot.status,
        message: snapshot.message,
        deck_selected: state.enhancer.deck_selected(),
        deck: state.enhancer.deck_label(),
        buffered_utterances: state.enhancer.buffered_utterances(),
        uptime_secs: (Utc::now() - state.app_start_time).num_seconds(),
    })
}

async fn get_status(State(state): State<Arc<AppState>>) -> JsonResponse<StatusSnapshot> {
    JsonResponse(state.enhancer.status())
}

async fn start_enhancer(
    State(state): State<Arc<AppState>>,
) -> Result<JsonResponse<Value>, ApiError> {
    state
        .enhancer
        .start()
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(JsonResponse(json!({ "is_running": true })))
}

async fn stop_enhancer(State(state): State<Arc<AppState>>) -> JsonResponse<Value> {
    state.enhancer.stop().await;
    JsonResponse(json!({ "is_running": false }))
}

async fn select_deck(
    State(state): State<Arc<AppState>>,
    JsonResponse(request): JsonResponse<DeckRequest>,
) -> Result<JsonResponse<Value>, ApiError> {
    let deck = FileDeck::open(&request.path)
        .await
        .map_err(|e| bad_request(format!("{:#}", e)))?;

    let snapshot = deck.snapshot();
    let style = analyze_theme(&snapshot);

    state
        .enhancer
        .attach_deck(Arc::new(deck), style.clone(), request.path.clone())
        .map_err(|e| bad_request(e.to_string()))?;

    Ok(JsonResponse(json!({
        "path": request.path,
        "slides": snapshot.slides.len(),
        "style": style,
    })))
}

async fn push_transcript(
    State(state): State<Arc<AppState>>,
    JsonResponse(request): JsonResponse<TranscriptRequest>,
) -> Result<JsonResponse<Value>, ApiError> {
    state.enhancer.transcript_sender().send(request.text).map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            JsonResponse(json!({ "error": "transcript channel closed" })),
        )
    })?;
    Ok(JsonResponse(
        json!({ "buffered_utterances": state.enhancer.buffered_utterances() }),
    ))
}

async fn generate_manual(
    State(state): State<Arc<AppState>>,
    JsonResponse(request): JsonResponse<GenerateRequest>,
) -> Result<JsonResponse<Value>, ApiError> {
    match state.enhancer.generate_manual(&request.topic).await {
        Ok(ApplyOutcome::Inserted(index)) => Ok(JsonResponse(json!({ "inserted": index }))),
        Ok(ApplyOutcome::Updated(index)) => Ok(JsonResponse(json!({ "updated": index }))),
        Ok(ApplyOutcome::GenerationFailed) => Err((
            StatusCode::BAD_GATEWAY,
            JsonResponse(json!({ "error": "content generation returned nothing usable" })),
        )),
        Err(e) => Err(bad_request(e.to_string())),
    }
}

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/enhancer/start", post(start_enhancer))
        .route("/enhancer/stop", post(stop_enhancer))
        .route("/deck", post(select_deck))
        .route("/transcript", post(push_transcript))
        .route("/generate", post(generate_manual))
        .layer(CorsLayer::permissive())
}

pub struct Server {
    state: Arc<AppState>,
    addr: SocketAddr,
}

impl Server {
    pub fn new(state: Arc<AppState>, addr: SocketAddr) -> Self {
        Server { state, addr }
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let app = create_router().with_state(self.state);

        info!("starting control server on {}", self.addr);

        serve(
            TcpListener::bind(self.addr).await?,
            app.into_make_service(),
        )
        .await
    }
}

// # start the auto enhancer
// curl -X POST "http://localhost:3030/enhancer/start"

// # feed it a transcribed utterance
// curl -X POST "http://localhost:3030/transcript" -H "Content-Type: application/json" -d '{"text": "so let me talk about electric vehicles for a moment"}'

// # check what it is doing
// curl "http://localhost:3030/status"

// # manually generate a slide
// curl -X POST "http://localhost:3030/generate" -H "Content-Type: application/json" -d '{"topic": "electric vehicle adoption"}'
