use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use forge_core::Command;
use forge_core::interview::InterviewSession;
use forge_core::voice::VoiceEvent;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Frames a client sends. Speech recognition happens on the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Transcript { text: String },
    StartedSpeaking,
    StoppedSpeaking,
}

impl From<ClientMessage> for VoiceEvent {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Transcript { text } => VoiceEvent::Transcript(text),
            ClientMessage::StartedSpeaking => VoiceEvent::UserStartedSpeaking,
            ClientMessage::StoppedSpeaking => VoiceEvent::UserStoppedSpeaking,
        }
    }
}

/// Frames the server sends; `speak` and `complete` carry text for the client's TTS.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Speak { text: String },
    Complete { text: String },
    Error { message: String },
}

impl From<Command> for ServerMessage {
    fn from(command: Command) -> Self {
        match command {
            Command::SpeakText(text) => ServerMessage::Speak { text },
            Command::SessionComplete(text) => ServerMessage::Complete { text },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub session_id: String,
}

/// Upgrades to a WebSocket that conducts the interview for an existing session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let session = state.storage.require_session(&query.session_id).await?;
    info!(session_id = %session.id, "WebSocket upgrade request received");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session.id)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let interview = match InterviewSession::new(
        state.storage.clone(),
        state.evaluator.clone(),
        state.bank.clone(),
        &session_id,
        state.interview,
    )
    .await
    {
        Ok(interview) => interview,
        Err(e) => {
            error!(session_id = %session_id, "Failed to start interview: {}", e);
            return;
        }
    };

    let (event_tx, event_rx) = mpsc::channel::<VoiceEvent>(32);
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let driver = tokio::spawn(interview.run(event_rx, command_tx));
    let (mut sender, mut receiver) = socket.split();
    info!(session_id = %session_id, "WebSocket interview started");

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                let done = matches!(command, Command::SessionComplete(_));
                if send_json(&mut sender, &ServerMessage::from(command)).await.is_err() {
                    break;
                }
                if done {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(client_msg) => {
                                if event_tx.send(client_msg.into()).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Ignoring malformed client message: {}", e);
                                let reply = ServerMessage::Error { message: e.to_string() };
                                if send_json(&mut sender, &reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ignore binary, ping and pong frames
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // The driver may already be gone; a failed send just means it finished.
    let _ = event_tx.send(VoiceEvent::Closed).await;
    match driver.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(session_id = %session_id, "Interview ended with error: {:#}", e),
        Err(e) => error!(session_id = %session_id, "Interview task failed: {}", e),
    }
    let _ = sender.close().await;
    info!(session_id = %session_id, "WebSocket connection closed");
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
