//! Reference server of record for the pi-player surfaces.

pub mod api;
pub mod content;
pub mod hub;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use piplayer_proto::keys::Key;
use piplayer_proto::protocol::{Component, PushEvent, API_PATH};
use piplayer_proto::surface::Surface;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

pub use state::{AppState, ServerState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(API_PATH, post(api::api_handler))
        .route("/ws/:surface", get(hub::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A running server.  Dropping the handle does not stop it; call `shutdown`.
pub struct ServerHandle {
    state: AppState,
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Serve on `listener` and watch `content_dir` every `rescan_interval`.
    pub async fn spawn(
        listener: TcpListener,
        content_dir: PathBuf,
        rescan_interval: Duration,
    ) -> anyhow::Result<Self> {
        let addr = listener.local_addr()?;
        let state = ServerState::new(content_dir);
        if let Err(e) = state.reload().await {
            warn!("initial scan failed: {}", e);
        }

        let cancel = CancellationToken::new();
        spawn_rescan(state.clone(), rescan_interval, cancel.clone());

        let app = router(state.clone());
        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            info!("piplayer server listening on http://{}", addr);
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                error!("HTTP server error: {}", e);
            }
        });

        Ok(Self {
            state,
            addr,
            cancel,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Inject a remote key press, as the input-device reader would.
    pub async fn push_remote_key(&self, key: Key) -> bool {
        let event = PushEvent::new(Component::Remote, "keyDown").with_argument("keyString", key.as_str());
        self.state.hub.push(Surface::Viewer, event).await
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Poll the content folder; any change in the listing is announced to every
/// surface as `playlist.newItems`.
fn spawn_rescan(state: AppState, interval: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut last = content::scan(&state.content_dir).ok();
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(100)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let fresh = content::scan(&state.content_dir).ok();
            if fresh == last {
                continue;
            }
            debug!("content folder changed");
            last = fresh;
            state
                .hub
                .push_all(
                    PushEvent::new(Component::Playlist, "newItems")
                        .with_message("detected file change. Get new items."),
                )
                .await;
        }
    });
}
