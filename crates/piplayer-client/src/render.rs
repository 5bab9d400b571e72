//! Host rendering primitives.
//!
//! Decoding and display belong to the host; the engine only issues these
//! calls.  Paths are already resolved to `/content/<filename>`.

use tracing::info;

pub trait MediaSurface: Send {
    fn play_video(&mut self, path: &str);
    fn set_video_paused(&mut self, paused: bool);
    /// Halt, rewind to zero and hide the video element.
    fn stop_video(&mut self);
    fn seek_video(&mut self, offset_secs: i64);
    fn show_image(&mut self, path: &str);
    fn play_audio(&mut self, path: &str);
    fn set_audio_paused(&mut self, paused: bool);
    fn stop_audio(&mut self);
    /// Clear whatever is on screen.
    fn blank(&mut self);
}

/// Surface for headless runs: every primitive becomes a log line.
#[derive(Debug, Default)]
pub struct LogSurface;

impl MediaSurface for LogSurface {
    fn play_video(&mut self, path: &str) {
        info!("render: video {}", path);
    }

    fn set_video_paused(&mut self, paused: bool) {
        info!("render: video paused={}", paused);
    }

    fn stop_video(&mut self) {
        info!("render: video stopped");
    }

    fn seek_video(&mut self, offset_secs: i64) {
        info!("render: video seek {:+}s", offset_secs);
    }

    fn show_image(&mut self, path: &str) {
        info!("render: image {}", path);
    }

    fn play_audio(&mut self, path: &str) {
        info!("render: audio {}", path);
    }

    fn set_audio_paused(&mut self, paused: bool) {
        info!("render: audio paused={}", paused);
    }

    fn stop_audio(&mut self) {
        info!("render: audio stopped");
    }

    fn blank(&mut self) {
        info!("render: blank");
    }
}
