use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

/// Path of the request/response endpoint on the server of record.
pub const API_PATH: &str = "/api";

/// Top-level routing key carried by every command and push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Player,
    Playlist,
    Remote,
    Connection,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Player,
        Component::Playlist,
        Component::Remote,
        Component::Connection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Player => "player",
            Component::Playlist => "playlist",
            Component::Remote => "remote",
            Component::Connection => "connection",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ProtoError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == raw)
            .ok_or_else(|| ProtoError::UnknownComponent(raw.to_string()))
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every `(component, method)` pair the server of record accepts on `POST /api`.
pub const RECOGNIZED_COMMANDS: &[(Component, &str)] = &[
    (Component::Player, "start"),
    (Component::Player, "sendCommand"),
    (Component::Player, "stop"),
    (Component::Player, "play"),
    (Component::Player, "pause"),
    (Component::Player, "seek"),
    (Component::Player, "previous"),
    (Component::Player, "next"),
    (Component::Playlist, "getItems"),
    (Component::Playlist, "getCurrent"),
    (Component::Playlist, "setCurrent"),
];

pub fn is_recognized(component: Component, method: &str) -> bool {
    RECOGNIZED_COMMANDS
        .iter()
        .any(|(c, m)| *c == component && *m == method)
}

/// Outbound one-shot request.  Answered by exactly one [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub component: Component,
    pub method: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,
}

impl Command {
    /// Build a command, rejecting pairs outside [`RECOGNIZED_COMMANDS`].
    pub fn new(
        component: Component,
        method: &str,
        arguments: Map<String, Value>,
    ) -> Result<Self, ProtoError> {
        if !is_recognized(component, method) {
            return Err(ProtoError::UnsupportedMethod {
                component: component.to_string(),
                method: method.to_string(),
            });
        }
        Ok(Self {
            component,
            method: method.to_string(),
            arguments,
        })
    }

    fn bare(component: Component, method: &str) -> Self {
        Self {
            component,
            method: method.to_string(),
            arguments: Map::new(),
        }
    }

    fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }

    pub fn player_start(path: &str, index: usize) -> Self {
        Self::bare(Component::Player, "start")
            .with("path", path)
            .with("index", index)
    }

    pub fn player_send_command(command: &str) -> Self {
        Self::bare(Component::Player, "sendCommand").with("command", command)
    }

    pub fn player_stop() -> Self {
        Self::bare(Component::Player, "stop")
    }

    pub fn player_play() -> Self {
        Self::bare(Component::Player, "play")
    }

    pub fn player_pause() -> Self {
        Self::bare(Component::Player, "pause")
    }

    pub fn player_seek(seconds: i64) -> Self {
        Self::bare(Component::Player, "seek").with("value", seconds)
    }

    pub fn player_previous() -> Self {
        Self::bare(Component::Player, "previous")
    }

    pub fn player_next() -> Self {
        Self::bare(Component::Player, "next")
    }

    pub fn get_items() -> Self {
        Self::bare(Component::Playlist, "getItems")
    }

    pub fn get_current() -> Self {
        Self::bare(Component::Playlist, "getCurrent")
    }

    pub fn set_current(index: usize) -> Self {
        Self::bare(Component::Playlist, "setCurrent").with("index", index)
    }

    pub fn int_argument(&self, name: &str) -> Option<i64> {
        self.arguments.get(name).and_then(as_int)
    }

    pub fn str_argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }
}

/// Reply to a [`Command`].  Matched by call, not by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    pub message: Value,
}

impl Response {
    pub fn ok(message: impl Into<Value>) -> Self {
        Self {
            success: true,
            event: None,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            event: None,
            message: Value::String(message.into()),
        }
    }

    pub fn with_event(mut self, event: &str) -> Self {
        self.event = Some(event.to_string());
        self
    }
}

/// Unsolicited server-to-client notification.
///
/// `component` stays a raw string so that unknown values survive decoding and
/// reach the router's single "unsupported" path.  Both naming styles used by
/// the server (`event`/`method`, `arguments`/`message`) are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub component: String,
    #[serde(default, alias = "method")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub message: Value,
}

impl PushEvent {
    pub fn new(component: Component, event: &str) -> Self {
        Self {
            component: component.to_string(),
            event: event.to_string(),
            arguments: None,
            message: Value::Null,
        }
    }

    pub fn with_argument(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.arguments
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<Value>) -> Self {
        self.message = message.into();
        self
    }

    pub fn from_command(command: &Command) -> Self {
        Self {
            component: command.component.to_string(),
            event: command.method.clone(),
            arguments: Some(command.arguments.clone()),
            message: Value::Null,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.as_ref().and_then(|args| args.get(name))
    }

    /// Integer argument; numeric strings are accepted since older servers
    /// send every argument as a string.
    pub fn int_argument(&self, name: &str) -> Option<i64> {
        self.argument(name).and_then(as_int)
    }

    pub fn str_argument(&self, name: &str) -> Option<&str> {
        self.argument(name).and_then(Value::as_str)
    }

    /// Integer carried either as `arguments.<name>` or as the bare message.
    pub fn int_payload(&self, name: &str) -> Option<i64> {
        self.int_argument(name).or_else(|| as_int(&self.message))
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_shape() {
        let cmd = Command::set_current(3);
        let encoded = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            encoded,
            json!({"component": "playlist", "method": "setCurrent", "arguments": {"index": 3}})
        );

        let bare = serde_json::to_value(Command::get_items()).unwrap();
        assert_eq!(bare, json!({"component": "playlist", "method": "getItems"}));
    }

    #[test]
    fn test_command_new_rejects_unknown_pair() {
        assert!(Command::new(Component::Player, "next", Map::new()).is_ok());
        let err = Command::new(Component::Playlist, "shuffle", Map::new()).unwrap_err();
        assert_eq!(
            err,
            ProtoError::UnsupportedMethod {
                component: "playlist".into(),
                method: "shuffle".into()
            }
        );
        assert!(Command::new(Component::Remote, "keyDown", Map::new()).is_err());
    }

    #[test]
    fn test_typed_constructors_are_recognized() {
        let all = [
            Command::player_start("a.mp4", 0),
            Command::player_send_command("pauseResume"),
            Command::player_stop(),
            Command::player_play(),
            Command::player_pause(),
            Command::player_seek(-15),
            Command::player_previous(),
            Command::player_next(),
            Command::get_items(),
            Command::get_current(),
            Command::set_current(1),
        ];
        for cmd in all {
            assert!(is_recognized(cmd.component, &cmd.method), "{:?}", cmd);
        }
    }

    #[test]
    fn test_push_event_accepts_both_styles() {
        let a = PushEvent::decode(
            r#"{"component":"remote","event":"keyDown","arguments":{"keyString":"KEY_UP"}}"#,
        )
        .unwrap();
        assert_eq!(a.event, "keyDown");
        assert_eq!(a.str_argument("keyString"), Some("KEY_UP"));

        let b = PushEvent::decode(r#"{"component":"player","method":"seek","arguments":{"value":"-15"}}"#)
            .unwrap();
        assert_eq!(b.event, "seek");
        assert_eq!(b.int_argument("value"), Some(-15));

        let c = PushEvent::decode(
            r#"{"success":true,"component":"playlist","event":"setCurrent","message":2}"#,
        )
        .unwrap();
        assert_eq!(c.int_payload("index"), Some(2));
    }

    #[test]
    fn test_unknown_component_still_decodes() {
        let ev = PushEvent::decode(r#"{"component":"lights","event":"dim"}"#).unwrap();
        assert_eq!(ev.component, "lights");
        assert!(Component::parse(&ev.component).is_err());
    }

    #[test]
    fn test_response_defaults() {
        let res: Response = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!res.success);
        assert_eq!(res.message, Value::Null);
    }
}
