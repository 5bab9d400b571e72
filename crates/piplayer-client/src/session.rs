//! Session: single-owner event loop for one client surface.
//!
//! The session owns the playlist store, the selection controller, the
//! playback engine and both channels.  Every input (push frames, channel
//! open/close, timer firings, local requests, finished command round-trips)
//! arrives as a `SessionEvent` on one queue and is handled to completion
//! before the next one is read, so push events are applied strictly in
//! receipt order.  Command round-trips run on their own tasks and report back
//! through the same queue; handling an event never waits on the network.
//!
//! After each event that changes observable state the session publishes a
//! `SessionUpdate` on a `tokio::sync::broadcast` channel.  A presentation
//! layer subscribes and projects it one-way.
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use piplayer_proto::config::ClientConfig;
use piplayer_proto::item::PlaylistItem;
use piplayer_proto::protocol::{Command, PushEvent, Response};
use piplayer_proto::surface::{self, Surface};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::command::{self, CommandTransport};
use crate::engine::{PlaybackEngine, PlaybackState, Transition};
use crate::error::PlaybackError;
use crate::playlist::PlaylistStore;
use crate::push::{LinkStatus, PushChannel};
use crate::remote::{RemoteAction, Step};
use crate::render::MediaSurface;
use crate::router::{MessageRouter, Route};
use crate::selection::SelectionController;

// ── SessionEvent ──────────────────────────────────────────────────────────────

/// All inputs into the session loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// Push handshake completed.
    PushOpened,
    /// One decoded push frame.
    PushMessage(PushEvent),
    /// Push connection dropped or failed to open.
    PushClosed { reason: String },
    /// Reconnect delay elapsed.
    ReconnectDue { generation: u64 },
    /// Auto-advance cue elapsed.
    AutoAdvance { generation: u64 },
    /// Outbound command from the presentation layer.
    Request(Command),
    /// A `getItems` round-trip finished.
    ItemsFetched { generation: u64, response: Response },
    /// Any other command round-trip finished.
    CommandDone { label: String, response: Response },
    Shutdown,
}

// ── SessionUpdate ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Link(LinkStatus),
    ItemsReplaced { len: usize },
    CurrentChanged(Option<usize>),
    HighlightChanged(Option<usize>),
    OverlayChanged(bool),
    Rendering(PlaybackState),
    PlaybackFailed(PlaybackError),
    /// A command was refused locally or answered with `success: false`.
    CommandFailed { label: String, message: String },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub surface: Surface,
    pub push_url: String,
    pub reconnect_delay: Duration,
    /// Start item 0 after the first fetch (viewer only).
    pub autostart: bool,
}

impl SessionOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            surface: config.surface,
            push_url: surface::push_url(&config.server_url, config.surface),
            reconnect_delay: config.reconnect_delay(),
            autostart: config.autostart,
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Session<C, M> {
    options: SessionOptions,
    store: PlaylistStore,
    selection: SelectionController,
    engine: PlaybackEngine<M>,
    router: MessageRouter,
    commands: Arc<C>,
    push: PushChannel,
    events: mpsc::Sender<SessionEvent>,
    updates: broadcast::Sender<SessionUpdate>,
    /// Set after the first successful `getItems`.
    fetched_once: bool,
    /// Only the answer to the latest `getItems` is applied.
    fetch_generation: u64,
    fetch_pending: bool,
}

impl<C: CommandTransport + 'static, M: MediaSurface> Session<C, M> {
    pub fn new(
        options: SessionOptions,
        commands: C,
        media: M,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let push = PushChannel::new(
            options.push_url.clone(),
            options.reconnect_delay,
            event_tx.clone(),
        );
        let (updates, _) = broadcast::channel(64);
        Self {
            options,
            store: PlaylistStore::new(),
            selection: SelectionController::new(),
            engine: PlaybackEngine::new(media, event_tx.clone()),
            router: MessageRouter::new(),
            commands: Arc::new(commands),
            push,
            events: event_tx,
            updates,
            fetched_once: false,
            fetch_generation: 0,
            fetch_pending: false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn playlist(&self) -> &PlaylistStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn engine(&self) -> &PlaybackEngine<M> {
        &self.engine
    }

    pub fn link_status(&self) -> LinkStatus {
        self.push.status()
    }

    pub fn push_channel(&self) -> &PushChannel {
        &self.push
    }

    /// Run until `Shutdown` arrives or every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<SessionEvent>) -> anyhow::Result<()> {
        info!(
            "session: starting {} surface against {}",
            self.options.surface, self.options.push_url
        );
        self.publish(SessionUpdate::Link(self.push.status()));
        self.push.connect();
        self.resync();

        loop {
            let Some(evt) = event_rx.recv().await else {
                info!("session: event channel closed, shutting down");
                break;
            };
            if self.handle_event(evt).is_break() {
                info!("session: shutdown requested");
                break;
            }
        }

        self.push.shutdown();
        self.engine.shutdown();
        Ok(())
    }

    pub fn handle_event(&mut self, evt: SessionEvent) -> ControlFlow<()> {
        match evt {
            SessionEvent::PushOpened => {
                let reopened = self.push.status() == LinkStatus::Reconnecting;
                self.push.handle_open();
                self.publish(SessionUpdate::Link(self.push.status()));
                // Events pushed while the link was down are lost, and a
                // playlist that never loaded is still missing.
                if reopened || (!self.fetched_once && !self.fetch_pending) {
                    self.resync();
                }
            }
            SessionEvent::PushMessage(event) => self.dispatch(event),
            SessionEvent::PushClosed { reason } => {
                self.push.handle_closed(&reason);
                self.publish(SessionUpdate::Link(self.push.status()));
            }
            SessionEvent::ReconnectDue { generation } => {
                self.push.handle_reconnect_due(generation);
                self.publish(SessionUpdate::Link(self.push.status()));
            }
            SessionEvent::AutoAdvance { generation } => {
                let result = self.engine.on_auto_advance(&mut self.store, generation);
                self.after_playback(result);
            }
            SessionEvent::Request(command) => self.send_command(command),
            SessionEvent::ItemsFetched {
                generation,
                response,
            } => self.apply_items(generation, response),
            SessionEvent::CommandDone { label, response } => {
                if response.success {
                    debug!("session: {} acknowledged", label);
                } else {
                    // The local state stays as it is.
                    let message = message_text(&response);
                    error!("session: {} rejected: {}", label, message);
                    self.publish(SessionUpdate::CommandFailed { label, message });
                }
            }
            SessionEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Ask for the playlist.  The answer comes back as `ItemsFetched`.
    pub fn resync(&mut self) {
        self.fetch_generation += 1;
        self.fetch_pending = true;
        let generation = self.fetch_generation;
        let commands = Arc::clone(&self.commands);
        let events = self.events.clone();
        tokio::spawn(async move {
            let response = commands.send(Command::get_items()).await;
            let _ = events
                .send(SessionEvent::ItemsFetched {
                    generation,
                    response,
                })
                .await;
        });
    }

    /// Replace the cache wholesale with a fetched playlist.
    fn apply_items(&mut self, generation: u64, response: Response) {
        if generation != self.fetch_generation {
            debug!("session: stale getItems answer {} dropped", generation);
            return;
        }
        self.fetch_pending = false;
        if !response.success {
            error!("session: getItems failed: {}", message_text(&response));
            return;
        }
        let items: Vec<PlaylistItem> = match serde_json::from_value(response.message) {
            Ok(items) => items,
            Err(e) => {
                error!("session: getItems returned an unreadable playlist: {}", e);
                return;
            }
        };

        let before = self.store.current();
        self.store.replace(items);
        self.selection.reconcile(self.store.len(), self.store.current());
        self.engine.resync(&self.store);
        info!("session: playlist replaced ({} items)", self.store.len());
        self.publish(SessionUpdate::ItemsReplaced {
            len: self.store.len(),
        });
        if self.store.current() != before {
            self.publish(SessionUpdate::CurrentChanged(self.store.current()));
        }

        let first = !self.fetched_once;
        self.fetched_once = true;
        if first
            && self.options.autostart
            && self.options.surface == Surface::Viewer
            && !self.store.is_empty()
        {
            let result = self.engine.start_item(&mut self.store, 0);
            self.after_playback(result);
        }
    }

    /// Fire a command on its own task; the outcome arrives as `CommandDone`.
    fn send_command(&self, command: Command) {
        let label = format!("{}.{}", command.component, command.method);
        if let Some(refused) = command::refuse_unrecognized(&command) {
            warn!("session: not sending unrecognised command {}", label);
            self.publish(SessionUpdate::CommandFailed {
                label,
                message: message_text(&refused),
            });
            return;
        }
        let commands = Arc::clone(&self.commands);
        let events = self.events.clone();
        tokio::spawn(async move {
            let response = commands.send(command).await;
            let _ = events.send(SessionEvent::CommandDone { label, response }).await;
        });
    }

    fn dispatch(&mut self, event: PushEvent) {
        debug!("session: push {}.{}", event.component, event.event);
        match self.router.route(&event) {
            Ok(route) => self.apply(route),
            Err(e) => warn!("session: dropping push event: {}", e),
        }
    }

    fn apply(&mut self, route: Route) {
        let result = match route {
            Route::RefreshItems => {
                self.resync();
                return;
            }
            Route::ApplyCurrent(index) => {
                self.apply_echoed_current(index);
                return;
            }
            Route::Disconnect => {
                self.push.handle_disconnect_request();
                self.publish(SessionUpdate::Link(self.push.status()));
                return;
            }
            Route::Remote(action) => {
                self.apply_remote(action);
                return;
            }
            Route::Start(index) => self.engine.start_item(&mut self.store, index),
            Route::Stop => Ok(self.engine.stop()),
            Route::Play => self.engine.play(&mut self.store),
            Route::Pause => Ok(self.engine.pause()),
            Route::Seek(offset) => Ok(self.engine.seek(offset)),
            Route::Previous => self.engine.previous(&mut self.store),
            Route::Next => self.engine.next(&mut self.store),
        };
        self.after_playback(result);
    }

    fn apply_remote(&mut self, action: RemoteAction) {
        let len = self.store.len();
        let result = match action {
            RemoteAction::MoveHighlight(step) => {
                match step {
                    Step::Forward => self.selection.move_down(len),
                    Step::Back => self.selection.move_up(len),
                };
                self.publish(SessionUpdate::HighlightChanged(self.selection.highlighted()));
                return;
            }
            RemoteAction::CommitHighlight => match self.selection.commit(len) {
                Some(index) => self.engine.start_item(&mut self.store, index as i64),
                None => {
                    self.publish(SessionUpdate::HighlightChanged(self.selection.highlighted()));
                    return;
                }
            },
            RemoteAction::ToggleOverlay => {
                let visible = self.selection.toggle_overlay(self.store.current());
                self.publish(SessionUpdate::OverlayChanged(visible));
                self.publish(SessionUpdate::HighlightChanged(self.selection.highlighted()));
                return;
            }
            RemoteAction::DismissOverlay => {
                if self.selection.overlay_visible() {
                    self.selection.dismiss_overlay(self.store.current());
                    self.publish(SessionUpdate::OverlayChanged(false));
                    self.publish(SessionUpdate::HighlightChanged(self.selection.highlighted()));
                }
                return;
            }
            RemoteAction::Playback(Step::Forward) => self.engine.next(&mut self.store),
            RemoteAction::Playback(Step::Back) => self.engine.previous(&mut self.store),
            RemoteAction::PlayPause => self.engine.play_pause(&mut self.store),
            RemoteAction::Stop => Ok(self.engine.stop()),
            RemoteAction::Seek(offset) => Ok(self.engine.seek(offset)),
        };
        self.after_playback(result);
    }

    /// Another surface moved the canonical index.  Playback is not touched.
    fn apply_echoed_current(&mut self, index: i64) {
        let applied = self
            .store
            .checked_index(index)
            .and_then(|i| self.store.set_current(i));
        match applied {
            Ok(true) => self.publish(SessionUpdate::CurrentChanged(self.store.current())),
            Ok(false) => debug!("session: current index {} already applied", index),
            Err(e) => warn!("session: ignoring echoed index: {}", e),
        }
    }

    fn after_playback(&mut self, result: Result<Transition, PlaybackError>) {
        match result {
            Ok(Transition::Started(index)) => {
                if self.selection.overlay_visible() {
                    self.selection.dismiss_overlay(Some(index));
                    self.publish(SessionUpdate::OverlayChanged(false));
                    self.publish(SessionUpdate::HighlightChanged(self.selection.highlighted()));
                }
                self.publish(SessionUpdate::CurrentChanged(Some(index)));
                self.publish(SessionUpdate::Rendering(self.engine.state()));
                // Tell the server of record; a rejection does not roll back.
                self.send_command(Command::set_current(index));
            }
            Ok(Transition::Updated) => {
                self.publish(SessionUpdate::Rendering(self.engine.state()));
            }
            Ok(Transition::Ignored) => {}
            Err(e) => {
                warn!("session: playback request failed: {}", e);
                self.publish(SessionUpdate::PlaybackFailed(e));
            }
        }
    }

    fn publish(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }
}

/// Next update for a subscriber, skipping over any it fell behind on.
/// `None` once the session is gone.
pub async fn next_update(updates: &mut broadcast::Receiver<SessionUpdate>) -> Option<SessionUpdate> {
    loop {
        match updates.recv().await {
            Ok(update) => return Some(update),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!("session: subscriber skipped {} updates", missed);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

fn message_text(response: &Response) -> String {
    match response.message.as_str() {
        Some(text) => text.to_string(),
        None => response.message.to_string(),
    }
}
