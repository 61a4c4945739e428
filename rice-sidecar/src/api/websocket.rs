use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::{AppState, WsEvent};

#[derive(Debug, Deserialize)]
struct WsIncoming {
    #[serde(rename = "type")]
    msg_type: String,
}

#[derive(Debug, Serialize)]
struct WsOutgoing {
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WsOutgoing {
    fn new(msg_type: &'static str, session_id: Option<String>) -> Self {
        Self {
            msg_type,
            session_id,
            step: None,
            session: None,
            error: None,
        }
    }
}

impl From<WsEvent> for WsOutgoing {
    fn from(event: WsEvent) -> Self {
        match event {
            WsEvent::RecordingStep { session_id, step } => WsOutgoing {
                step: serde_json::to_value(&step).ok(),
                ..WsOutgoing::new("recording_step", Some(session_id))
            },
            WsEvent::RecordingStatus { session_id, session } => WsOutgoing {
                session: serde_json::to_value(&session).ok(),
                ..WsOutgoing::new("recording_status", Some(session_id))
            },
            WsEvent::Error { session_id, error } => WsOutgoing {
                error: Some(error),
                ..WsOutgoing::new("error", Some(session_id))
            },
            WsEvent::Pong => WsOutgoing::new("pong", None),
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request from client: {}", client_id);
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state))
}

async fn handle_socket(socket: WebSocket, client_id: String, state: Arc<AppState>) {
    state.client_connected(&client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.subscribe();

    // Forward broadcast events to this client
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("WebSocket client lagged, {} events dropped", missed);
                    continue;
                }
                Err(_) => break,
            };

            let json = match serde_json::to_string(&WsOutgoing::from(event)) {
                Ok(j) => j,
                Err(_) => continue,
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Incoming messages are only pings
    let state_clone = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(incoming) = serde_json::from_str::<WsIncoming>(&text) {
                    if incoming.msg_type == "ping" {
                        state_clone.broadcast(WsEvent::Pong);
                    }
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.client_disconnected(&client_id);
    tracing::info!("WebSocket disconnected: {}", client_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_shape() {
        let msg = WsOutgoing::from(WsEvent::Error {
            session_id: "s1".to_string(),
            error: "Could not launch a browser".to_string(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["session_id"], "s1");
        assert!(json.get("step").is_none());
    }

    #[test]
    fn test_pong_has_no_session() {
        let json = serde_json::to_value(WsOutgoing::from(WsEvent::Pong)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong"}));
    }
}
