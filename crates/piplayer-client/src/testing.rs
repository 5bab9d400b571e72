//! Recording fakes for the two external seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use piplayer_proto::item::PlaylistItem;
use piplayer_proto::protocol::{Command, Response};

use crate::command::CommandTransport;
use crate::render::MediaSurface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Video(String),
    VideoPaused(bool),
    StopVideo,
    Seek(i64),
    Image(String),
    Audio(String),
    AudioPaused(bool),
    StopAudio,
    Blank,
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<Rendered>,
}

impl RecordingSurface {
    pub fn last(&self) -> Option<&Rendered> {
        self.calls.last()
    }
}

impl MediaSurface for RecordingSurface {
    fn play_video(&mut self, path: &str) {
        self.calls.push(Rendered::Video(path.to_string()));
    }

    fn set_video_paused(&mut self, paused: bool) {
        self.calls.push(Rendered::VideoPaused(paused));
    }

    fn stop_video(&mut self) {
        self.calls.push(Rendered::StopVideo);
    }

    fn seek_video(&mut self, offset_secs: i64) {
        self.calls.push(Rendered::Seek(offset_secs));
    }

    fn show_image(&mut self, path: &str) {
        self.calls.push(Rendered::Image(path.to_string()));
    }

    fn play_audio(&mut self, path: &str) {
        self.calls.push(Rendered::Audio(path.to_string()));
    }

    fn set_audio_paused(&mut self, paused: bool) {
        self.calls.push(Rendered::AudioPaused(paused));
    }

    fn stop_audio(&mut self) {
        self.calls.push(Rendered::StopAudio);
    }

    fn blank(&mut self) {
        self.calls.push(Rendered::Blank);
    }
}

/// Answers `getItems` from a shared item list, fails `setCurrent` on demand
/// and acknowledges everything else.  While `offline` is set every call fails
/// as an unreachable server would.
#[derive(Debug, Clone, Default)]
pub struct RecordingCommands {
    pub sent: Arc<Mutex<Vec<Command>>>,
    pub items: Arc<Mutex<Vec<PlaylistItem>>>,
    pub reject_set_current: bool,
    pub set_current_delay: Option<Duration>,
    pub offline: Arc<AtomicBool>,
}

impl RecordingCommands {
    pub fn with_items(items: Vec<PlaylistItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self, method: &str) -> usize {
        self.sent().iter().filter(|c| c.method == method).count()
    }

    pub fn set_items(&self, items: Vec<PlaylistItem>) {
        if let Ok(mut guard) = self.items.lock() {
            *guard = items;
        }
    }
}

impl CommandTransport for RecordingCommands {
    async fn send(&self, command: Command) -> Response {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command.clone());
        }
        if self.offline.load(Ordering::SeqCst) {
            return Response::failure("connection refused");
        }
        if command.method == "setCurrent" {
            if let Some(delay) = self.set_current_delay {
                tokio::time::sleep(delay).await;
            }
        }
        match command.method.as_str() {
            "getItems" => {
                let items = self.items.lock().map(|i| i.clone()).unwrap_or_default();
                Response::ok(serde_json::to_value(items).unwrap_or_default())
            }
            "setCurrent" if self.reject_set_current => Response::failure("index rejected"),
            _ => Response::ok(serde_json::Value::Null),
        }
    }
}
