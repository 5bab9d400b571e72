//! Playback engine.
//!
//! ```text
//!            start(video)            start(image)
//!   Idle ───────────────▶ PlayingVideo ◀──────────▶ ShowingImage
//!    ▲                         │                         │
//!    └──────────── stop ───────┴─────────── stop ────────┘
//! ```
//!
//! The engine owns the only auto-advance timer.  Every state-changing
//! operation cancels it before doing anything else.

use piplayer_proto::item::{MediaType, PlaylistItem};
use piplayer_proto::media;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::PlaybackError;
use crate::playlist::PlaylistStore;
use crate::render::MediaSurface;
use crate::session::SessionEvent;
use crate::timer::OneShot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    PlayingVideo { paused: bool },
    ShowingImage { paused: bool },
}

/// What a successful operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new item is on screen; the canonical index must be published.
    Started(usize),
    /// The active item changed state (paused, resumed, stopped, seeked).
    Updated,
    /// Nothing to do for the current state.
    Ignored,
}

pub struct PlaybackEngine<M> {
    surface: M,
    state: PlaybackState,
    audio_active: bool,
    /// The item currently rendered, if any.
    on_screen: Option<PlaylistItem>,
    timer: OneShot,
    events: mpsc::Sender<SessionEvent>,
}

impl<M: MediaSurface> PlaybackEngine<M> {
    pub fn new(surface: M, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            surface,
            state: PlaybackState::Idle,
            audio_active: false,
            on_screen: None,
            timer: OneShot::new(),
            events,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Total number of auto-advance timers ever armed.
    pub fn timers_armed_total(&self) -> u64 {
        self.timer.armed_total()
    }

    pub fn start_item(
        &mut self,
        store: &mut PlaylistStore,
        index: i64,
    ) -> Result<Transition, PlaybackError> {
        let index = store.checked_index(index)?;
        self.timer.cancel();

        let item = match store.get(index) {
            Some(item) => item.clone(),
            None => return Err(PlaybackError::IndexOutOfRange { index: index as i64, len: store.len() }),
        };
        let kind = item.visual_kind().map_err(|_| PlaybackError::UnsupportedMedia {
            file: item.visual.clone(),
            extension: media::extension(&item.visual),
        })?;

        match kind {
            MediaType::Video => self.render_video(&item),
            MediaType::Image => self.render_image(&item),
        }
        store.set_current(index)?;
        info!("playback: started item {} ({})", index, item.visual);
        self.arm_cue(&item);
        self.on_screen = Some(item);
        Ok(Transition::Started(index))
    }

    pub fn next(&mut self, store: &mut PlaylistStore) -> Result<Transition, PlaybackError> {
        self.timer.cancel();
        let index = store.wrap_next(store.current())?;
        self.start_item(store, index as i64)
    }

    pub fn previous(&mut self, store: &mut PlaylistStore) -> Result<Transition, PlaybackError> {
        self.timer.cancel();
        let index = store.wrap_previous(store.current())?;
        self.start_item(store, index as i64)
    }

    /// Toggle whichever primitive is active.  From `Idle` the current item is
    /// started again.
    pub fn play_pause(&mut self, store: &mut PlaylistStore) -> Result<Transition, PlaybackError> {
        match self.state {
            PlaybackState::Idle => self.restart_current(store),
            PlaybackState::PlayingVideo { paused } | PlaybackState::ShowingImage { paused } => {
                self.set_paused(!paused);
                Ok(Transition::Updated)
            }
        }
    }

    pub fn play(&mut self, store: &mut PlaylistStore) -> Result<Transition, PlaybackError> {
        match self.state {
            PlaybackState::Idle => self.restart_current(store),
            PlaybackState::PlayingVideo { paused: true } | PlaybackState::ShowingImage { paused: true } => {
                self.set_paused(false);
                Ok(Transition::Updated)
            }
            _ => Ok(Transition::Ignored),
        }
    }

    pub fn pause(&mut self) -> Transition {
        match self.state {
            PlaybackState::PlayingVideo { paused: false } | PlaybackState::ShowingImage { paused: false } => {
                self.set_paused(true);
                Transition::Updated
            }
            _ => Transition::Ignored,
        }
    }

    /// Halt, rewind and blank the surface.
    pub fn stop(&mut self) -> Transition {
        self.timer.cancel();
        if self.state == PlaybackState::Idle && !self.audio_active {
            return Transition::Ignored;
        }
        self.surface.stop_video();
        self.surface.stop_audio();
        self.surface.blank();
        self.audio_active = false;
        self.on_screen = None;
        self.state = PlaybackState::Idle;
        info!("playback: stopped");
        Transition::Updated
    }

    /// Relative seek.  Only video is seekable; images ignore it.
    pub fn seek(&mut self, offset_secs: i64) -> Transition {
        match self.state {
            PlaybackState::PlayingVideo { .. } => {
                self.surface.seek_video(offset_secs);
                Transition::Updated
            }
            _ => {
                debug!("playback: seek {:+}s ignored for {:?}", offset_secs, self.state);
                Transition::Ignored
            }
        }
    }

    /// Timer firing.  Stale generations are dropped.
    pub fn on_auto_advance(
        &mut self,
        store: &mut PlaylistStore,
        generation: u64,
    ) -> Result<Transition, PlaybackError> {
        if !self.timer.take_if_current(generation) {
            debug!("playback: stale auto-advance {} ignored", generation);
            return Ok(Transition::Ignored);
        }
        debug!("playback: auto-advance");
        self.next(store)
    }

    /// After a playlist replace.  The running countdown survives as long as
    /// the item on screen is still the current one; otherwise it is dropped.
    pub fn resync(&mut self, store: &PlaylistStore) {
        if self.on_screen.is_none() || store.current_item() == self.on_screen.as_ref() {
            return;
        }
        if self.timer.is_armed() {
            debug!("playback: current item replaced, auto-advance dropped");
        }
        self.timer.cancel();
    }

    pub fn shutdown(&mut self) {
        self.timer.cancel();
    }

    fn restart_current(&mut self, store: &mut PlaylistStore) -> Result<Transition, PlaybackError> {
        match store.current() {
            Some(index) => self.start_item(store, index as i64),
            None => Err(PlaybackError::EmptyPlaylist),
        }
    }

    fn set_paused(&mut self, paused: bool) {
        self.timer.cancel();
        match &mut self.state {
            PlaybackState::PlayingVideo { paused: p } => {
                *p = paused;
                self.surface.set_video_paused(paused);
            }
            PlaybackState::ShowingImage { paused: p } => {
                *p = paused;
                if self.audio_active {
                    self.surface.set_audio_paused(paused);
                }
            }
            PlaybackState::Idle => return,
        }
        if !paused {
            if let Some(item) = self.on_screen.clone() {
                self.arm_cue(&item);
            }
        }
    }

    fn render_video(&mut self, item: &PlaylistItem) {
        // Video owns the audio channel.
        self.surface.stop_audio();
        self.audio_active = false;
        self.surface.play_video(&media::content_path(&item.visual));
        self.state = PlaybackState::PlayingVideo { paused: false };
    }

    fn render_image(&mut self, item: &PlaylistItem) {
        if matches!(self.state, PlaybackState::PlayingVideo { .. }) {
            self.surface.stop_video();
        }
        self.surface.show_image(&media::content_path(&item.visual));
        if item.cues.clear_audio || !item.has_audio() {
            self.surface.stop_audio();
            self.audio_active = false;
        }
        if item.has_audio() {
            self.surface.play_audio(&media::content_path(&item.audio));
            self.audio_active = true;
        }
        self.state = PlaybackState::ShowingImage { paused: false };
    }

    fn arm_cue(&mut self, item: &PlaylistItem) {
        if let Some(delay) = item.cues.auto_advance() {
            let generation = self
                .timer
                .arm(delay, self.events.clone(), |generation| SessionEvent::AutoAdvance { generation });
            debug!("playback: auto-advance in {:?} (timer {})", delay, generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use piplayer_proto::item::Cues;

    use super::*;
    use crate::testing::{Rendered, RecordingSurface};

    fn cue(secs: u64) -> Cues {
        Cues {
            timeout_seconds: Some(secs),
            clear_audio: false,
        }
    }

    fn setup(items: Vec<PlaylistItem>) -> (
        PlaybackEngine<RecordingSurface>,
        PlaylistStore,
        mpsc::Receiver<SessionEvent>,
    ) {
        let (tx, rx) = mpsc::channel(16);
        let mut store = PlaylistStore::new();
        store.replace(items);
        (PlaybackEngine::new(RecordingSurface::default(), tx), store, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_wraps_to_first_image() {
        let (mut engine, mut store, mut rx) = setup(vec![
            PlaylistItem::new("a.jpg"),
            PlaylistItem::new("b.mp4").with_cues(cue(5)),
        ]);

        assert_eq!(engine.start_item(&mut store, 1), Ok(Transition::Started(1)));
        assert_eq!(engine.state(), PlaybackState::PlayingVideo { paused: false });
        assert_eq!(engine.surface().last(), Some(&Rendered::Video("/content/b.mp4".into())));
        assert!(engine.timer_armed());

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(200)).await;
        let generation = match rx.try_recv() {
            Ok(SessionEvent::AutoAdvance { generation }) => generation,
            other => panic!("expected auto-advance, got {:?}", other),
        };

        assert_eq!(engine.on_auto_advance(&mut store, generation), Ok(Transition::Started(0)));
        assert_eq!(store.current(), Some(0));
        assert_eq!(engine.state(), PlaybackState::ShowingImage { paused: false });
        assert!(engine.surface().calls.contains(&Rendered::Image("/content/a.jpg".into())));
        assert!(!engine.timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_cancels_previous_timer() {
        let (mut engine, mut store, mut rx) = setup(vec![
            PlaylistItem::new("a.jpg").with_cues(cue(3)),
            PlaylistItem::new("b.png").with_cues(cue(10)),
        ]);
        engine.start_item(&mut store, 0).unwrap();
        engine.start_item(&mut store, 1).unwrap();
        assert_eq!(engine.timers_armed_total(), 2);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err(), "the first timer must be dead");
    }

    #[tokio::test]
    async fn test_stale_firing_is_ignored() {
        let (mut engine, mut store, _rx) = setup(vec![
            PlaylistItem::new("a.jpg").with_cues(cue(3)),
            PlaylistItem::new("b.png"),
        ]);
        engine.start_item(&mut store, 0).unwrap();
        engine.stop();
        assert_eq!(engine.on_auto_advance(&mut store, 1), Ok(Transition::Ignored));
        assert_eq!(store.current(), Some(0));
    }

    #[tokio::test]
    async fn test_out_of_range_leaves_current_unchanged() {
        let (mut engine, mut store, _rx) =
            setup(vec![PlaylistItem::new("a.jpg"), PlaylistItem::new("b.jpg")]);
        engine.start_item(&mut store, 1).unwrap();
        assert_eq!(
            engine.start_item(&mut store, 2),
            Err(PlaybackError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            engine.start_item(&mut store, -1),
            Err(PlaybackError::IndexOutOfRange { index: -1, len: 2 })
        );
        assert_eq!(store.current(), Some(1));
    }

    #[tokio::test]
    async fn test_unsupported_extension_aborts() {
        let (mut engine, mut store, _rx) =
            setup(vec![PlaylistItem::new("a.jpg"), PlaylistItem::new("notes.txt")]);
        engine.start_item(&mut store, 0).unwrap();
        let calls = engine.surface().calls.len();
        assert_eq!(
            engine.start_item(&mut store, 1),
            Err(PlaybackError::UnsupportedMedia {
                file: "notes.txt".into(),
                extension: ".txt".into()
            })
        );
        assert_eq!(store.current(), Some(0));
        assert_eq!(engine.surface().calls.len(), calls);
    }

    #[tokio::test]
    async fn test_next_previous_wrap() {
        let (mut engine, mut store, _rx) = setup(vec![
            PlaylistItem::new("a.jpg"),
            PlaylistItem::new("b.jpg"),
            PlaylistItem::new("c.jpg"),
        ]);
        engine.start_item(&mut store, 2).unwrap();
        assert_eq!(engine.next(&mut store), Ok(Transition::Started(0)));
        assert_eq!(engine.previous(&mut store), Ok(Transition::Started(2)));
    }

    #[tokio::test]
    async fn test_empty_playlist() {
        let (mut engine, mut store, _rx) = setup(Vec::new());
        assert_eq!(engine.next(&mut store), Err(PlaybackError::EmptyPlaylist));
        assert_eq!(engine.play_pause(&mut store), Err(PlaybackError::EmptyPlaylist));
    }

    #[tokio::test]
    async fn test_seek_only_applies_to_video() {
        let (mut engine, mut store, _rx) =
            setup(vec![PlaylistItem::new("a.jpg"), PlaylistItem::new("b.webm")]);
        engine.start_item(&mut store, 0).unwrap();
        assert_eq!(engine.seek(15), Transition::Ignored);
        engine.start_item(&mut store, 1).unwrap();
        assert_eq!(engine.seek(15), Transition::Updated);
        assert_eq!(engine.surface().last(), Some(&Rendered::Seek(15)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_and_resume_rearms() {
        let (mut engine, mut store, mut rx) =
            setup(vec![PlaylistItem::new("a.png").with_cues(cue(5)), PlaylistItem::new("b.png")]);
        engine.start_item(&mut store, 0).unwrap();
        assert_eq!(engine.play_pause(&mut store), Ok(Transition::Updated));
        assert_eq!(engine.state(), PlaybackState::ShowingImage { paused: true });
        assert!(!engine.timer_armed());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(engine.play(&mut store), Ok(Transition::Updated));
        assert!(engine.timer_armed());
        assert_eq!(engine.pause(), Transition::Updated);
        assert_eq!(engine.pause(), Transition::Ignored);
    }

    #[tokio::test]
    async fn test_stop_blanks_and_play_pause_restarts() {
        let (mut engine, mut store, _rx) = setup(vec![PlaylistItem::new("a.mp4")]);
        engine.start_item(&mut store, 0).unwrap();
        assert_eq!(engine.stop(), Transition::Updated);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.surface().last(), Some(&Rendered::Blank));
        assert!(engine.surface().calls.contains(&Rendered::StopVideo));
        assert_eq!(engine.stop(), Transition::Ignored);

        assert_eq!(engine.play_pause(&mut store), Ok(Transition::Started(0)));
    }

    #[tokio::test]
    async fn test_companion_audio_rules() {
        let mut cleared = PlaylistItem::new("c.png");
        cleared.cues.clear_audio = true;
        let (mut engine, mut store, _rx) = setup(vec![
            PlaylistItem::new("a.png").with_audio("a.mp3"),
            PlaylistItem::new("b.mp4"),
            cleared,
        ]);

        engine.start_item(&mut store, 0).unwrap();
        assert_eq!(engine.surface().last(), Some(&Rendered::Audio("/content/a.mp3".into())));

        engine.surface_mut_for_test().calls.clear();
        engine.start_item(&mut store, 1).unwrap();
        assert_eq!(
            engine.surface().calls,
            vec![Rendered::StopAudio, Rendered::Video("/content/b.mp4".into())]
        );

        engine.surface_mut_for_test().calls.clear();
        engine.start_item(&mut store, 2).unwrap();
        assert_eq!(
            engine.surface().calls,
            vec![
                Rendered::StopVideo,
                Rendered::Image("/content/c.png".into()),
                Rendered::StopAudio
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_keeps_countdown_of_unchanged_item() {
        let (mut engine, mut store, mut rx) = setup(vec![
            PlaylistItem::new("a.jpg").with_cues(cue(5)),
            PlaylistItem::new("b.mp4"),
        ]);
        engine.start_item(&mut store, 0).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Same item still current: the countdown is not restarted.
        store.replace(vec![
            PlaylistItem::new("a.jpg").with_cues(cue(5)),
            PlaylistItem::new("b.mp4"),
            PlaylistItem::new("c.png"),
        ]);
        engine.resync(&store);
        assert_eq!(engine.timers_armed_total(), 1);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::AutoAdvance { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_drops_cue_of_displaced_item() {
        let (mut engine, mut store, mut rx) = setup(vec![
            PlaylistItem::new("a.jpg").with_cues(cue(5)),
            PlaylistItem::new("b.mp4"),
        ]);
        engine.start_item(&mut store, 0).unwrap();

        // A different item now sits under the index that is still on screen.
        store.replace(vec![PlaylistItem::new("0.png").with_cues(cue(2)), PlaylistItem::new("a.jpg")]);
        engine.resync(&store);
        assert!(!engine.timer_armed());
        assert_eq!(engine.timers_armed_total(), 1);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(rx.try_recv().is_err());

        // Resuming re-arms the cue of what is actually shown.
        engine.pause();
        engine.play(&mut store).unwrap();
        assert_eq!(engine.timers_armed_total(), 2);
    }

    impl<M: MediaSurface> PlaybackEngine<M> {
        fn surface_mut_for_test(&mut self) -> &mut M {
            &mut self.surface
        }
    }
}
