use crate::error::ApiError;
use crate::state::AppState;
use crate::ws::ws_handler;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use forge_core::models::{KnowledgeMap, SessionSummary};
use forge_core::scoring::session_topic_averages;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Builds the HTTP surface with a permissive CORS policy for a separate frontend.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/start-session", post(start_session))
        .route("/end-session", post(end_session))
        .route("/session-status", get(session_status))
        .route("/sessions", get(sessions))
        .route("/knowledge-map", get(knowledge_map))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Forge API - Forge your interview skills",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub daily_room_url: String,
    pub daily_token: String,
}

async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }

    let session = state.storage.create_session(user_id).await?;
    let room = state.rooms.create_room(&session.id).await;
    if state.voice_enabled {
        info!(session_id = %session.id, "Voice session ready; connect via /ws");
    } else {
        info!(session_id = %session.id, "Voice disabled - text interview via /ws only");
    }

    Ok(Json(StartSessionResponse {
        session_id: session.id,
        daily_room_url: room.url,
        daily_token: room.token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub final_scores: BTreeMap<String, f64>,
    pub improvement: BTreeMap<String, f64>,
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EndSessionRequest>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    let session = state.storage.end_session(&req.session_id).await?;
    let improvement = state.storage.improvement(&session.user_id).await?;
    Ok(Json(EndSessionResponse {
        final_scores: session_topic_averages(&session),
        improvement,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub current_question: String,
    pub transcript: String,
    pub questions_asked: usize,
    pub current_scores: BTreeMap<String, Vec<f64>>,
}

async fn session_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let session = state.storage.require_session(&query.session_id).await?;
    let (current_question, transcript) = session
        .last_question()
        .map(|q| (q.question.clone(), q.answer.clone()))
        .unwrap_or_default();

    Ok(Json(SessionStatusResponse {
        current_question,
        transcript,
        questions_asked: session.questions.len(),
        current_scores: session.current_scores,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

async fn sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state.storage.user_sessions(&query.user_id).await?;
    Ok(Json(SessionsResponse { sessions }))
}

async fn knowledge_map(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<KnowledgeMap>, ApiError> {
    Ok(Json(state.storage.knowledge_map(&query.user_id).await?))
}
