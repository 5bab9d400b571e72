//! Push fan-out.  Each surface has at most one live websocket; a newer
//! connection takes the slot and the older one is told to go away.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use piplayer_proto::protocol::{Component, PushEvent};
use piplayer_proto::surface::Surface;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::AppState;

const OUTBOX_CAPACITY: usize = 64;

/// One connection's claim on a surface.
pub struct Registration {
    pub id: u64,
    pub outbox: mpsc::Receiver<PushEvent>,
    /// Cancelled when a newer connection takes the surface.  Independent of
    /// the outbox, so delivery never depends on queue space.
    pub displaced: CancellationToken,
}

struct Slot {
    id: u64,
    tx: mpsc::Sender<PushEvent>,
    displaced: CancellationToken,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct Hub {
    slots: RwLock<HashMap<Surface, Slot>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the surface's slot.  A previous holder is displaced.
    pub async fn register(&self, surface: Surface) -> Registration {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        let (tx, outbox) = mpsc::channel(OUTBOX_CAPACITY);
        let displaced = CancellationToken::new();
        let slot = Slot {
            id,
            tx,
            displaced: displaced.clone(),
            connected_at: Utc::now(),
        };
        let previous = self.slots.write().await.insert(surface, slot);
        if let Some(old) = previous {
            info!("{} connection {} replaced by {}", surface, old.id, id);
            old.displaced.cancel();
        }
        Registration {
            id,
            outbox,
            displaced,
        }
    }

    /// Release the slot if `id` still holds it.
    pub async fn unregister(&self, surface: Surface, id: u64) {
        let mut slots = self.slots.write().await;
        if slots.get(&surface).map(|s| s.id) == Some(id) {
            if let Some(slot) = slots.remove(&surface) {
                let secs = (Utc::now() - slot.connected_at).num_seconds();
                info!("{} connection {} closed after {}s", surface, id, secs);
            }
        }
    }

    pub async fn is_active(&self, surface: Surface) -> bool {
        self.slots.read().await.contains_key(&surface)
    }

    /// Returns whether a connection took the event.
    pub async fn push(&self, surface: Surface, event: PushEvent) -> bool {
        let slots = self.slots.read().await;
        let Some(slot) = slots.get(&surface) else {
            debug!("no {} connection for {}.{}", surface, event.component, event.event);
            return false;
        };
        match slot.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("{} outbox refused event: {}", surface, e);
                false
            }
        }
    }

    pub async fn push_all(&self, event: PushEvent) {
        for surface in Surface::ALL {
            self.push(surface, event.clone()).await;
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(surface): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(surface) = Surface::parse(&surface) else {
        return (StatusCode::NOT_FOUND, "unknown surface").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, surface, state))
}

async fn handle_socket(socket: WebSocket, surface: Surface, state: AppState) {
    let Registration {
        id,
        mut outbox,
        displaced,
    } = state.hub.register(surface).await;
    info!("{} connection {} opened", surface, id);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            biased;

            _ = displaced.cancelled() => {
                let bye = PushEvent::new(Component::Connection, "disconnect")
                    .with_message("another client connected");
                if let Ok(text) = serde_json::to_string(&bye) {
                    let _ = sender.send(Message::Text(text)).await;
                }
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            out = outbox.recv() => {
                let Some(event) = out else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(Message::Text(text))) => {
                        debug!("{} connection {} sent {:?}", surface, id, text);
                    }
                    _ => {}
                }
            }
        }
    }

    state.hub.unregister(surface, id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_connection_takes_over() {
        let hub = Hub::new();
        let mut first = hub.register(Surface::Viewer).await;
        let mut second = hub.register(Surface::Viewer).await;
        assert_ne!(first.id, second.id);
        assert!(first.displaced.is_cancelled());
        assert!(!second.displaced.is_cancelled());

        assert!(hub.push(Surface::Viewer, PushEvent::new(Component::Player, "next")).await);
        assert_eq!(second.outbox.try_recv().unwrap().event, "next");
        assert!(first.outbox.try_recv().is_err());

        // The stale connection's cleanup must not evict the new one.
        hub.unregister(Surface::Viewer, first.id).await;
        assert!(hub.is_active(Surface::Viewer).await);
        hub.unregister(Surface::Viewer, second.id).await;
        assert!(!hub.is_active(Surface::Viewer).await);
    }

    #[tokio::test]
    async fn test_push_to_absent_surface() {
        let hub = Hub::new();
        assert!(!hub.push(Surface::Control, PushEvent::new(Component::Playlist, "newItems")).await);
    }

    #[tokio::test]
    async fn test_push_all_reaches_every_surface() {
        let hub = Hub::new();
        let mut viewer = hub.register(Surface::Viewer).await;
        let mut menu = hub.register(Surface::Menu).await;
        hub.push_all(PushEvent::new(Component::Playlist, "newItems")).await;
        assert!(viewer.outbox.try_recv().is_ok());
        assert!(menu.outbox.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_takeover_reaches_a_full_outbox() {
        let hub = Hub::new();
        let mut stalled = hub.register(Surface::Control).await;
        for _ in 0..OUTBOX_CAPACITY {
            assert!(hub.push(Surface::Control, PushEvent::new(Component::Playlist, "newItems")).await);
        }
        assert!(!hub.push(Surface::Control, PushEvent::new(Component::Playlist, "newItems")).await);

        let _fresh = hub.register(Surface::Control).await;
        assert!(stalled.displaced.is_cancelled());
        // Queued events are still there; the displacement did not need a slot.
        assert!(stalled.outbox.try_recv().is_ok());
    }
}
