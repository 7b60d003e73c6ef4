//! WebSocket handler for live session play.
//!
//! Once connected, a client receives every [`SessionEvent`] of the session
//! as JSON, in the order the session committed them, and can send moves
//! over the same socket.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{session_id}?participant_id=<id>`
//! 2. Server checks the participant is seated and subscribes to the session
//! 3. Server spawns a send task forwarding events and command responses
//! 4. On disconnect, the send task is aborted; the session keeps running
//!
//! # Client Messages
//!
//! ```javascript
//! ws.send(JSON.stringify({ type: "flip" }));
//! ws.send(JSON.stringify({ type: "slap" }));
//! ws.send(JSON.stringify({ type: "deal" }));
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use speed_war::{FlipOutcome, ParticipantId, Session, SessionEvent, SessionId, SlapVerdict};
use tokio::sync::broadcast::{self, error::RecvError};

use super::{AppState, api_error, deal_as};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    participant_id: i64,
}

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Flip the next card of the participant's play deck
    Flip,
    /// Slap the exposed pair
    Slap,
    /// Deal a new game once the previous one has ended
    Deal,
}

/// Response messages sent to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerResponse {
    Success { message: String },
    /// `retryable` tells whether sending the same message again may succeed
    Error { message: String, retryable: bool },
}

/// Upgrade HTTP connection to WebSocket for a session.
///
/// # Path Parameters
///
/// - `session_id`: Session to connect to
///
/// # Query Parameters
///
/// - `participant_id`: Participant seated at the session
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// Returns `404 Not Found` for an unknown session and `403 Forbidden` for a
/// participant who is not seated there.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<i64>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let id = SessionId(session_id);
    let participant = ParticipantId(query.participant_id);

    let session = match state.session_manager.get_session(id).await {
        Ok(session) => session,
        Err(e) => return api_error(e).into_response(),
    };
    if let Err(e) = session.seat_of(participant) {
        return api_error(e).into_response();
    }

    // Subscribe before upgrading so no event between the two is missed
    let events = match state.session_manager.subscribe(id).await {
        Ok(events) => events,
        Err(e) => return api_error(e).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session, participant, events))
}

/// Handle an established WebSocket connection.
///
/// # Arguments
///
/// - `socket`: The WebSocket connection
/// - `session`: Session the participant is connected to
/// - `participant`: Seated participant sending moves
/// - `events`: Subscription to the session's event stream
async fn handle_socket(
    socket: WebSocket,
    session: Session,
    participant: ParticipantId,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = session.id();

    info!(
        "WebSocket connected: session={}, participant={}",
        session_id, participant
    );

    let (response_tx, mut response_rx) = tokio::sync::mpsc::channel::<String>(32);

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Subscriber lagged behind session {}: {} events dropped", session_id, skipped);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            error!("Failed to serialize session event: {}", e);
                            continue;
                        }
                    };

                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Some(response_json) = response_rx.recv() => {
                    if sender.send(Message::Text(response_json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => handle_client_message(client_msg, &session, participant).await,
                    Err(e) => {
                        warn!("Failed to parse client message: {}", e);
                        ServerResponse::Error {
                            message: "Invalid message format".to_string(),
                            retryable: false,
                        }
                    }
                };

                if let Ok(json) = serde_json::to_string(&response)
                    && response_tx.send(json).await.is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    info!(
        "WebSocket disconnected: session={}, participant={}",
        session_id, participant
    );
}

/// Apply a client move to the session and describe the result.
async fn handle_client_message(
    msg: ClientMessage,
    session: &Session,
    participant: ParticipantId,
) -> ServerResponse {
    let result = match msg {
        ClientMessage::Flip => session
            .request_flip(participant)
            .await
            .map(|outcome| match outcome {
                FlipOutcome::Flipped { card, sequence } => {
                    format!("Flipped {} (flip #{})", card, sequence)
                }
                FlipOutcome::Held => "Flip held: the exposed pair must be slapped".to_string(),
                FlipOutcome::Eliminated { winner } => {
                    format!("No cards left; participant {} wins", winner)
                }
            }),
        ClientMessage::Slap => session
            .request_slap(participant)
            .await
            .map(|verdict| match verdict {
                SlapVerdict::Resolved { cards_won } => format!("Slap won {} cards", cards_won),
                SlapVerdict::Rejected { reason } => format!("Slap rejected: {}", reason),
            }),
        ClientMessage::Deal => deal_as(session, participant)
            .await
            .map(|()| "Dealt a new game".to_string()),
    };

    match result {
        Ok(message) => ServerResponse::Success { message },
        Err(e) => {
            if e.is_fatal() {
                error!("Session {} failed: {}", session.id(), e);
            }
            ServerResponse::Error {
                message: e.client_message(),
                retryable: e.is_retryable(),
            }
        }
    }
}
