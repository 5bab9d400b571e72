//! Push channel: long-lived server-initiated notification stream.
//!
//! ```text
//!   Connecting ──handshake──▶ Open ──drop──▶ Closed ──delay──▶ Connecting
//!                                              │
//!                          connection.disconnect (terminal, no retry)
//! ```
//!
//! The socket reader runs in its own task and forwards every frame into the
//! session queue in receipt order.  All state transitions happen on the
//! session loop, which is the only owner of the reconnect timer.

use std::time::Duration;

use futures_util::StreamExt;
use piplayer_proto::protocol::PushEvent;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::session::SessionEvent;
use crate::timer::OneShot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// User-visible connection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// First handshake in progress.
    Connecting,
    Connected,
    /// Dropped; a reconnect is pending or in progress.
    Reconnecting,
    /// The server ended the session.  Needs re-authorization, never retried.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    ScheduleReconnect,
    /// A reconnect timer is already pending; nothing new is scheduled.
    AlreadyPending,
    /// The session was terminated by the server.
    Terminal,
}

/// Reconnect bookkeeping with no IO attached.
#[derive(Debug)]
pub struct LinkState {
    state: ChannelState,
    reconnect_pending: bool,
    terminated: bool,
    dropped: bool,
    scheduled_total: u64,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Connecting,
            reconnect_pending: false,
            terminated: false,
            dropped: false,
            scheduled_total: 0,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn scheduled_total(&self) -> u64 {
        self.scheduled_total
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn on_connecting(&mut self) {
        self.state = ChannelState::Connecting;
    }

    pub fn on_open(&mut self) {
        self.state = ChannelState::Open;
    }

    pub fn on_close(&mut self) -> CloseAction {
        self.state = ChannelState::Closed;
        self.dropped = true;
        if self.terminated {
            return CloseAction::Terminal;
        }
        if self.reconnect_pending {
            return CloseAction::AlreadyPending;
        }
        self.reconnect_pending = true;
        self.scheduled_total += 1;
        CloseAction::ScheduleReconnect
    }

    /// The reconnect delay elapsed.  Returns whether to dial again.
    pub fn on_reconnect_due(&mut self) -> bool {
        if !self.reconnect_pending {
            return false;
        }
        self.reconnect_pending = false;
        if self.terminated {
            return false;
        }
        self.state = ChannelState::Connecting;
        true
    }

    /// Server-directed `connection.disconnect`.
    pub fn terminate(&mut self) {
        self.terminated = true;
        self.reconnect_pending = false;
    }

    pub fn status(&self) -> LinkStatus {
        if self.terminated {
            return LinkStatus::Disconnected;
        }
        match self.state {
            ChannelState::Open => LinkStatus::Connected,
            ChannelState::Connecting if !self.dropped => LinkStatus::Connecting,
            _ => LinkStatus::Reconnecting,
        }
    }
}

pub struct PushChannel {
    url: String,
    reconnect_delay: Duration,
    link: LinkState,
    connection: Option<AbortHandle>,
    reconnect_timer: OneShot,
    events: mpsc::Sender<SessionEvent>,
}

impl PushChannel {
    pub fn new(url: String, reconnect_delay: Duration, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            url,
            reconnect_delay,
            link: LinkState::new(),
            connection: None,
            reconnect_timer: OneShot::new(),
            events,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }

    /// Dial the server.  Any previous reader task is dropped first.
    pub fn connect(&mut self) {
        if let Some(old) = self.connection.take() {
            old.abort();
        }
        self.link.on_connecting();
        info!("push channel: connecting to {}", self.url);
        let task = tokio::spawn(run_connection(self.url.clone(), self.events.clone()));
        self.connection = Some(task.abort_handle());
    }

    pub fn handle_open(&mut self) {
        self.link.on_open();
        info!("push channel: open");
    }

    pub fn handle_closed(&mut self, reason: &str) -> CloseAction {
        self.connection = None;
        let action = self.link.on_close();
        match action {
            CloseAction::ScheduleReconnect => {
                warn!(
                    "push channel closed ({}), reconnecting in {:?} (attempt {})",
                    reason,
                    self.reconnect_delay,
                    self.link.scheduled_total()
                );
                self.reconnect_timer
                    .arm(self.reconnect_delay, self.events.clone(), |generation| {
                        SessionEvent::ReconnectDue { generation }
                    });
            }
            CloseAction::AlreadyPending => {
                debug!("push channel closed ({}), reconnect already pending", reason);
            }
            CloseAction::Terminal => {
                warn!("push channel closed ({}) after server disconnect; not retrying", reason);
            }
        }
        action
    }

    pub fn handle_reconnect_due(&mut self, generation: u64) {
        if !self.reconnect_timer.take_if_current(generation) {
            debug!("push channel: stale reconnect timer {} ignored", generation);
            return;
        }
        if self.link.on_reconnect_due() {
            self.connect();
        }
    }

    /// Server asked us to go away; suppress every further reconnect.
    pub fn handle_disconnect_request(&mut self) {
        self.link.terminate();
        self.reconnect_timer.cancel();
        warn!("push channel: server ended the session; re-authorization required");
    }

    pub fn shutdown(&mut self) {
        self.reconnect_timer.cancel();
        if let Some(task) = self.connection.take() {
            task.abort();
        }
    }
}

async fn run_connection(url: String, events: mpsc::Sender<SessionEvent>) {
    let reason = match pump(&url, &events).await {
        Ok(()) => "closed by server".to_string(),
        Err(e) => e.to_string(),
    };
    let _ = events.send(SessionEvent::PushClosed { reason }).await;
}

async fn pump(url: &str, events: &mpsc::Sender<SessionEvent>) -> Result<(), TransportError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;
    if events.send(SessionEvent::PushOpened).await.is_err() {
        return Ok(());
    }

    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => match serde_json::from_str::<PushEvent>(&text) {
                Ok(event) => {
                    // Awaiting here keeps delivery strictly in receipt order.
                    if events.send(SessionEvent::PushMessage(event)).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => warn!("push channel: dropping frame: {}", TransportError::from(e)),
            },
            Message::Close(frame) => {
                debug!("push channel: close frame {:?}", frame);
                return Ok(());
            }
            _ => {}
        }
    }
    Ok(())
}
