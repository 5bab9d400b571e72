use crate::error::ProtoError;

/// Canonical remote key vocabulary (`arguments.keyString` on `remote` events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Enter,
    Select,
    ContextMenu,
    Dot,
    Compose,
    PlayPause,
    Stop,
    FastForward,
    Rewind,
    Back,
    Home,
}

impl Key {
    pub const ALL: [Key; 17] = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::PageUp,
        Key::PageDown,
        Key::Enter,
        Key::Select,
        Key::ContextMenu,
        Key::Dot,
        Key::Compose,
        Key::PlayPause,
        Key::Stop,
        Key::FastForward,
        Key::Rewind,
        Key::Back,
        Key::Home,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Up => "KEY_UP",
            Key::Down => "KEY_DOWN",
            Key::Left => "KEY_LEFT",
            Key::Right => "KEY_RIGHT",
            Key::PageUp => "KEY_PAGEUP",
            Key::PageDown => "KEY_PAGEDOWN",
            Key::Enter => "KEY_ENTER",
            Key::Select => "KEY_SELECT",
            Key::ContextMenu => "KEY_CONTEXT_MENU",
            Key::Dot => "KEY_DOT",
            Key::Compose => "KEY_COMPOSE",
            Key::PlayPause => "KEY_PLAYPAUSE",
            Key::Stop => "KEY_STOP",
            Key::FastForward => "KEY_FASTFORWARD",
            Key::Rewind => "KEY_REWIND",
            Key::Back => "KEY_BACK",
            Key::Home => "KEY_HOME",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ProtoError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == raw)
            .ok_or_else(|| ProtoError::UnknownKey(raw.to_string()))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
