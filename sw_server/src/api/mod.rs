//! HTTP/WebSocket API for the Speed War server.
//!
//! # Modules
//!
//! - [`sessions`]: session management and moves (deal, flip, slap)
//! - [`websocket`]: live session events and moves over one socket
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                        - Health check
//! POST   /api/v1/sessions               - Create session
//! GET    /api/v1/sessions               - List sessions
//! GET    /api/v1/sessions/{id}          - Session snapshot
//! DELETE /api/v1/sessions/{id}          - Close session
//! POST   /api/v1/sessions/{id}/deal     - Deal a new game ({"participant_id": N})
//! POST   /api/v1/sessions/{id}/flip     - Flip ({"participant_id": N})
//! POST   /api/v1/sessions/{id}/slap     - Slap ({"participant_id": N})
//! GET    /ws/{id}?participant_id=N      - WebSocket
//! ```
//!
//! Participant identifiers are trusted as given; identity is resolved
//! upstream of this server. Only the human participant of a session may
//! deal, over either transport.
//!
//! Every error body carries `retryable`: when true the same request may
//! succeed if sent again unchanged.
//!
//! # CORS
//!
//! CORS is configured permissively for development.

pub mod sessions;
pub mod websocket;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use speed_war::{GameError, GameResult, ParticipantId, Seat, Session, SessionManager, db::Database};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    /// Present when decks are persisted in PostgreSQL
    pub database: Option<Database>,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether resending the same request may succeed
    pub retryable: bool,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a game error to a status code and a client-safe message.
///
/// Rejected moves are `409 Conflict` and leave the session unchanged; an
/// invariant violation is `500` because the session has been abandoned.
pub fn api_error(error: GameError) -> ApiError {
    let status = match &error {
        GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        GameError::UnknownParticipant(_) => StatusCode::FORBIDDEN,
        GameError::CardNotFound { .. } | GameError::InvalidState(_) => StatusCode::CONFLICT,
        GameError::InvariantViolation(_) | GameError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        log::error!("Request failed: {}", error);
    }

    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
            retryable: error.is_retryable(),
        }),
    )
}

/// Deal a new game on behalf of `participant`.
///
/// Only the human seat may start a game; the automated participant is
/// refused with `InvalidState` and anyone else with `UnknownParticipant`.
pub async fn deal_as(session: &Session, participant: ParticipantId) -> GameResult<()> {
    match session.seat_of(participant)? {
        Seat::Human => session.deal().await,
        Seat::Automated => Err(GameError::InvalidState(
            "only the human participant may deal".to_string(),
        )),
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with the session manager
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route(
            "/sessions/{session_id}",
            get(sessions::get_session).delete(sessions::close_session),
        )
        .route("/sessions/{session_id}/deal", post(sessions::deal))
        .route("/sessions/{session_id}/flip", post(sessions::flip))
        .route("/sessions/{session_id}/slap", post(sessions::slap));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{session_id}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":"memory","sessions":0,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };
    let sessions = state.session_manager.list_sessions().await.len();

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "storage": storage,
            "sessions": sessions,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use speed_war::game::{CardId, DeckId};
    use speed_war::SessionId;

    #[test]
    fn test_api_error_marks_retryable_errors() {
        let (status, Json(body)) = api_error(GameError::CardNotFound {
            card: CardId(5),
            deck: DeckId(3),
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.retryable);
        assert!(body.error.starts_with("Move rejected"));

        let (status, Json(body)) = api_error(GameError::InvalidState("not your turn".to_string()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.retryable);

        let (status, Json(body)) = api_error(GameError::SessionNotFound(SessionId(9)));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.retryable);
    }

    #[test]
    fn test_error_body_serializes_retryable_flag() {
        let (_, Json(body)) = api_error(GameError::InvariantViolation("broken".to_string()));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["retryable"], false);
        assert_eq!(value["error"], "Invariant violation: broken");
    }

    #[tokio::test]
    async fn test_only_the_human_participant_may_deal() {
        let manager = SessionManager::new(
            std::sync::Arc::new(speed_war::MemoryDeckRepository::new()),
            speed_war::SessionConfig::default(),
        );
        let id = manager.create_session(ParticipantId(42), "alice").await.unwrap();
        let session = manager.get_session(id).await.unwrap();
        let automated = session.participant(Seat::Automated).id;

        let err = deal_as(&session, automated).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidState(_)));
        let err = deal_as(&session, ParticipantId(7777)).await.unwrap_err();
        assert!(matches!(err, GameError::UnknownParticipant(_)));
        assert_eq!(session.phase().await, speed_war::Phase::Idle);

        deal_as(&session, ParticipantId(42)).await.unwrap();
        assert_eq!(session.phase().await, speed_war::Phase::HumanTurn);
        manager.shutdown().await;
    }
}
