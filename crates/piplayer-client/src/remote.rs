//! Remote input router: key string to a single action.
//!
//! Two navigation axes stay separate.  Up/down move the overlay highlight;
//! left/right and page-up/down drive playback directly.

use piplayer_proto::keys::Key;
use piplayer_proto::protocol::PushEvent;
use piplayer_proto::ProtoError;

/// Seconds moved by fast-forward and rewind.
pub const SEEK_STEP_SECS: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    MoveHighlight(Step),
    Playback(Step),
    CommitHighlight,
    ToggleOverlay,
    DismissOverlay,
    PlayPause,
    Stop,
    Seek(i64),
}

/// Exactly one action per key.
pub fn action_for(key: Key) -> RemoteAction {
    match key {
        Key::Up => RemoteAction::MoveHighlight(Step::Back),
        Key::Down => RemoteAction::MoveHighlight(Step::Forward),
        Key::Left | Key::PageUp => RemoteAction::Playback(Step::Back),
        Key::Right | Key::PageDown => RemoteAction::Playback(Step::Forward),
        Key::Enter | Key::Select => RemoteAction::CommitHighlight,
        Key::ContextMenu | Key::Home | Key::Dot | Key::Compose => RemoteAction::ToggleOverlay,
        Key::Back => RemoteAction::DismissOverlay,
        Key::PlayPause => RemoteAction::PlayPause,
        Key::Stop => RemoteAction::Stop,
        Key::FastForward => RemoteAction::Seek(SEEK_STEP_SECS),
        Key::Rewind => RemoteAction::Seek(-SEEK_STEP_SECS),
    }
}

/// Key string of a `remote` event: `arguments.keyString`, or a bare string
/// message from older servers.
pub fn key_string(event: &PushEvent) -> Option<&str> {
    event.str_argument("keyString").or_else(|| event.message.as_str())
}

pub fn resolve(event: &PushEvent) -> Result<RemoteAction, ProtoError> {
    let raw = key_string(event).ok_or_else(|| ProtoError::BadArgument {
        name: "keyString",
        context: format!("remote.{}", event.event),
    })?;
    Key::parse(raw).map(action_for)
}

#[cfg(test)]
mod tests {
    use piplayer_proto::protocol::Component;

    use super::*;

    fn key_down(key: &str) -> PushEvent {
        PushEvent::new(Component::Remote, "keyDown").with_argument("keyString", key)
    }

    #[test]
    fn test_axes_are_separate() {
        assert_eq!(resolve(&key_down("KEY_UP")), Ok(RemoteAction::MoveHighlight(Step::Back)));
        assert_eq!(resolve(&key_down("KEY_DOWN")), Ok(RemoteAction::MoveHighlight(Step::Forward)));
        assert_eq!(resolve(&key_down("KEY_LEFT")), Ok(RemoteAction::Playback(Step::Back)));
        assert_eq!(resolve(&key_down("KEY_PAGEDOWN")), Ok(RemoteAction::Playback(Step::Forward)));
    }

    #[test]
    fn test_aliases_share_one_action() {
        assert_eq!(action_for(Key::Enter), action_for(Key::Select));
        assert_eq!(action_for(Key::Home), action_for(Key::ContextMenu));
        assert_eq!(action_for(Key::Dot), RemoteAction::ToggleOverlay);
    }

    #[test]
    fn test_stop_does_not_fall_through_to_seek() {
        assert_eq!(action_for(Key::Stop), RemoteAction::Stop);
        assert_eq!(action_for(Key::FastForward), RemoteAction::Seek(15));
        assert_eq!(action_for(Key::Rewind), RemoteAction::Seek(-15));
    }

    #[test]
    fn test_bare_message_key() {
        let ev = PushEvent::new(Component::Remote, "keyDown").with_message("KEY_PLAYPAUSE");
        assert_eq!(resolve(&ev), Ok(RemoteAction::PlayPause));
    }

    #[test]
    fn test_unknown_and_missing_keys() {
        assert_eq!(
            resolve(&key_down("KEY_VOLUMEUP")),
            Err(ProtoError::UnknownKey("KEY_VOLUMEUP".into()))
        );
        assert!(resolve(&PushEvent::new(Component::Remote, "keyDown")).is_err());
    }
}
