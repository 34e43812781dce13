//! Notification stream connection
//!
//! Owns at most one long-lived server-sent-events stream. State moves
//! `Idle -> Connecting -> Connected -> Closing -> Idle`; a connection can only
//! be opened from `Idle`, so repeated `connect()` calls never stack streams.

use crate::config::NotificationConfig;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Closing,
}

/// One `data:` line received from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub data: String,
    pub received_at: DateTime<Utc>,
}

/// Explicit owner of the notification stream
pub struct ConnectionManager {
    stream_url: String,
    client: Client,
    state: Arc<Mutex<ConnectionState>>,
    sender: broadcast::Sender<Notification>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(stream_url: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            stream_url: stream_url.into(),
            client: Client::new(),
            state: Arc::new(Mutex::new(ConnectionState::Idle)),
            sender,
            task: Mutex::new(None),
        }
    }

    /// Manager for the configured stream, `None` when no stream is configured
    pub fn from_config(config: &NotificationConfig) -> Option<Self> {
        config
            .stream_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.channel_capacity))
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Open the stream in a background task; `false` when a connection is already active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if *state != ConnectionState::Idle {
                debug!("Connection already {:?}, ignoring connect", *state);
                return false;
            }
            *state = ConnectionState::Connecting;
        }

        info!("🔗 Connecting to notification stream: {}", self.stream_url);
        let handle = tokio::spawn(run_stream(
            self.client.clone(),
            self.stream_url.clone(),
            self.state.clone(),
            self.sender.clone(),
        ));
        *lock(&self.task) = Some(handle);
        true
    }

    /// Close the stream; no-op when idle
    pub fn disconnect(&self) {
        {
            let mut state = lock(&self.state);
            if *state == ConnectionState::Idle {
                return;
            }
            *state = ConnectionState::Closing;
        }

        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        set_state(&self.state, ConnectionState::Idle);
        info!("🔌 Notification stream closed");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    *lock(state) = next;
}

async fn run_stream(
    client: Client,
    url: String,
    state: Arc<Mutex<ConnectionState>>,
    sender: broadcast::Sender<Notification>,
) {
    let response = match client.get(&url).header(ACCEPT, "text/event-stream").send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!("Notification stream refused with HTTP {}", response.status());
            set_state(&state, ConnectionState::Idle);
            return;
        }
        Err(e) => {
            warn!("Notification stream connection failed: {}", e);
            set_state(&state, ConnectionState::Idle);
            return;
        }
    };

    {
        let mut current = lock(&state);
        if *current != ConnectionState::Connecting {
            return;
        }
        *current = ConnectionState::Connected;
    }
    info!("📡 Notification stream connected");

    let mut stream = response.bytes_stream();
    let mut buffer = LineBuffer::default();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for line in buffer.push(&bytes) {
                    if let Some(notification) = parse_event_line(&line) {
                        // No subscribers is fine
                        let _ = sender.send(notification);
                    }
                }
            }
            Err(e) => {
                warn!("Notification stream error: {}", e);
                break;
            }
        }
    }

    debug!("Notification stream ended");
    set_state(&state, ConnectionState::Idle);
}

/// Raw stream bytes split into complete lines; a line is only decoded once its
/// newline has arrived, so multi-byte characters may straddle chunks
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

/// Notification for a server-sent-events `data:` line
pub fn parse_event_line(line: &str) -> Option<Notification> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        return None;
    }

    Some(Notification {
        data: data.to_string(),
        received_at: Utc::now(),
    })
}
