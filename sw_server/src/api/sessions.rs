//! Session management API handlers.
//!
//! Flip and slap are the two moves of the game; both answer immediately
//! with the outcome while the resulting events stream over the session's
//! WebSocket.
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/sessions \
//!   -H "Content-Type: application/json" \
//!   -d '{"participant_id": 42, "name": "alice"}'
//! curl -X POST http://localhost:6969/api/v1/sessions/1/deal \
//!   -H "Content-Type: application/json" -d '{"participant_id": 42}'
//! curl -X POST http://localhost:6969/api/v1/sessions/1/flip \
//!   -H "Content-Type: application/json" -d '{"participant_id": 42}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use speed_war::session::SessionSummary;
use speed_war::{FlipOutcome, ParticipantId, SessionId, SessionView, SlapVerdict};

use super::{ApiError, AppState, api_error, deal_as};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub participant_id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub participant_id: i64,
}

/// Open a session for a human participant against the automated opponent.
///
/// Returns `201 Created` with the new session ID. The session starts idle
/// until dealt.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let id = state
        .session_manager
        .create_session(ParticipantId(request.participant_id), request.name)
        .await
        .map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id: id.0 }),
    ))
}

/// List all live sessions.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.session_manager.list_sessions().await)
}

/// Snapshot of one session: phase, turn owner, exposed pair and deck counts.
///
/// # Errors
///
/// - `404 Not Found`: Unknown session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .session_manager
        .get_session(SessionId(session_id))
        .await
        .map_err(api_error)?;

    session.snapshot().await.map(Json).map_err(api_error)
}

/// Close a session and stop its automated loop.
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .session_manager
        .close_session(SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deal a new game. Only the session's human participant may deal.
///
/// # Errors
///
/// - `403 Forbidden`: Participant is not seated at this session
/// - `409 Conflict`: A game is already in progress, or the automated
///   participant asked to deal
pub async fn deal(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .session_manager
        .get_session(SessionId(session_id))
        .await
        .map_err(api_error)?;

    deal_as(&session, ParticipantId(request.participant_id))
        .await
        .map_err(api_error)?;
    session.snapshot().await.map(Json).map_err(api_error)
}

/// Flip the participant's next card.
///
/// # Errors
///
/// - `403 Forbidden`: Participant is not seated at this session
/// - `409 Conflict`: Not the participant's turn, or no game in progress
pub async fn flip(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<FlipOutcome>, ApiError> {
    let session = state
        .session_manager
        .get_session(SessionId(session_id))
        .await
        .map_err(api_error)?;

    session
        .request_flip(ParticipantId(request.participant_id))
        .await
        .map(Json)
        .map_err(api_error)
}

/// Slap the exposed pair. A rejected slap is `200 OK` with the reason.
pub async fn slap(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<SlapVerdict>, ApiError> {
    let session = state
        .session_manager
        .get_session(SessionId(session_id))
        .await
        .map_err(api_error)?;

    session
        .request_slap(ParticipantId(request.participant_id))
        .await
        .map(Json)
        .map_err(api_error)
}
