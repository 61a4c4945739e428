use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{RecordedStep, RecordingSession};
use crate::recording::BrowserRecorder;
use crate::store::StepRepository;

/// WebSocket event types broadcast to clients
#[derive(Debug, Clone)]
pub enum WsEvent {
    RecordingStep {
        session_id: String,
        step: RecordedStep,
    },
    RecordingStatus {
        session_id: String,
        session: RecordingSession,
    },
    Error {
        session_id: String,
        error: String,
    },
    Pong,
}

/// Connected WebSocket client info
#[derive(Debug)]
pub struct ConnectedClient {
    pub connected_at: Instant,
}

/// Active recorder and the client that started it
pub struct ActiveRecorder {
    pub recorder: Arc<BrowserRecorder>,
    /// Used for cleanup when that client disconnects
    pub client_id: Option<String>,
}

/// Shared application state
pub struct AppState {
    pub config: Config,

    /// Recording sessions: session_id -> recorder. At most one is capturing.
    pub recordings: DashMap<String, ActiveRecorder>,

    pub connected_clients: DashMap<String, ConnectedClient>,

    /// Total connection count (for metrics)
    connection_count: AtomicUsize,

    pub repository: StepRepository,

    /// Broadcast channel for WebSocket events
    pub ws_broadcast: broadcast::Sender<WsEvent>,

    /// Serializes recording starts so two browsers are never launched at once
    pub recording_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, repository: StepRepository) -> Self {
        let (tx, _) = broadcast::channel(1024);

        Self {
            config,
            recordings: DashMap::new(),
            connected_clients: DashMap::new(),
            connection_count: AtomicUsize::new(0),
            repository,
            ws_broadcast: tx,
            recording_lock: Mutex::new(()),
        }
    }

    pub fn broadcast(&self, event: WsEvent) {
        // Ignore send errors (no receivers)
        let _ = self.ws_broadcast.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.ws_broadcast.subscribe()
    }

    /// Look up a recorder without holding the map entry across awaits
    pub fn recorder(&self, session_id: &str) -> Result<Arc<BrowserRecorder>> {
        self.recordings
            .get(session_id)
            .map(|active| Arc::clone(&active.recorder))
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))
    }

    pub async fn broadcast_status(&self, recorder: &BrowserRecorder) {
        let session = recorder.session().await;
        self.broadcast(WsEvent::RecordingStatus {
            session_id: session.id.clone(),
            session,
        });
    }

    pub fn client_connected(&self, client_id: &str) {
        self.connected_clients.insert(
            client_id.to_string(),
            ConnectedClient {
                connected_at: Instant::now(),
            },
        );
        let count = self.connection_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            "Client {} connected (total: {}, active: {})",
            client_id,
            count,
            self.connected_clients.len()
        );
    }

    /// Unregister a client and cancel any recording it left behind
    pub fn client_disconnected(&self, client_id: &str) {
        if let Some((_, client)) = self.connected_clients.remove(client_id) {
            tracing::debug!(
                "Client {} disconnected after {:?} (active: {})",
                client_id,
                client.connected_at.elapsed(),
                self.connected_clients.len()
            );
        }

        let orphaned: Vec<String> = self
            .recordings
            .iter()
            .filter(|entry| entry.client_id.as_deref() == Some(client_id))
            .map(|entry| entry.key().clone())
            .collect();

        for session_id in orphaned {
            if let Some((_, active)) = self.recordings.remove(&session_id) {
                tracing::info!("Cleaning up orphaned recording session: {}", session_id);
                tokio::spawn(async move {
                    if let Err(e) = active.recorder.cancel().await {
                        tracing::warn!("Failed to cancel orphaned recording {}: {}", session_id, e);
                    }
                });
            }
        }
    }

    pub fn active_connection_count(&self) -> usize {
        self.connected_clients.len()
    }
}
