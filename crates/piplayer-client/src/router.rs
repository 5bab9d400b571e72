//! Message router.  A static `(component, event)` table decides where each
//! push event goes; everything outside it takes the single unsupported path.

use std::collections::HashMap;

use piplayer_proto::protocol::{Component, PushEvent};
use piplayer_proto::ProtoError;
use tracing::warn;

use crate::remote::{self, RemoteAction};

/// Matches any event name of a component.
const ANY_EVENT: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    RefreshItems,
    ApplyCurrent,
    Start,
    Stop,
    Play,
    Pause,
    Seek,
    Previous,
    Next,
    Remote,
    Disconnect,
}

pub const ROUTE_TABLE: &[(Component, &str, Handler)] = &[
    (Component::Playlist, "newItems", Handler::RefreshItems),
    (Component::Playlist, "setCurrent", Handler::ApplyCurrent),
    (Component::Player, "start", Handler::Start),
    (Component::Player, "stop", Handler::Stop),
    (Component::Player, "play", Handler::Play),
    (Component::Player, "pause", Handler::Pause),
    (Component::Player, "seek", Handler::Seek),
    (Component::Player, "previous", Handler::Previous),
    (Component::Player, "next", Handler::Next),
    (Component::Remote, ANY_EVENT, Handler::Remote),
    (Component::Connection, "disconnect", Handler::Disconnect),
];

/// A push event resolved to one concrete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RefreshItems,
    ApplyCurrent(i64),
    Start(i64),
    Stop,
    Play,
    Pause,
    Seek(i64),
    Previous,
    Next,
    Remote(RemoteAction),
    Disconnect,
}

pub struct MessageRouter {
    table: HashMap<Component, HashMap<&'static str, Handler>>,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        let mut table: HashMap<Component, HashMap<&'static str, Handler>> = HashMap::new();
        for (component, event, handler) in ROUTE_TABLE {
            if table.entry(*component).or_default().insert(*event, *handler).is_some() {
                warn!("router: duplicate route {}.{}", component, event);
            }
        }
        Self { table }
    }

    pub fn handler(&self, component: Component, event: &str) -> Option<Handler> {
        let events = self.table.get(&component)?;
        events.get(event).or_else(|| events.get(ANY_EVENT)).copied()
    }

    pub fn route(&self, event: &PushEvent) -> Result<Route, ProtoError> {
        let component = Component::parse(&event.component)?;
        let handler = self
            .handler(component, &event.event)
            .ok_or_else(|| ProtoError::UnsupportedMethod {
                component: event.component.clone(),
                method: event.event.clone(),
            })?;

        let context = || format!("{}.{}", event.component, event.event);
        Ok(match handler {
            Handler::RefreshItems => Route::RefreshItems,
            Handler::ApplyCurrent => Route::ApplyCurrent(event.int_payload("index").ok_or_else(
                || ProtoError::BadArgument {
                    name: "index",
                    context: context(),
                },
            )?),
            Handler::Start => Route::Start(event.int_payload("index").ok_or_else(|| {
                ProtoError::BadArgument {
                    name: "index",
                    context: context(),
                }
            })?),
            Handler::Stop => Route::Stop,
            Handler::Play => Route::Play,
            Handler::Pause => Route::Pause,
            Handler::Seek => Route::Seek(event.int_payload("value").ok_or_else(|| {
                ProtoError::BadArgument {
                    name: "value",
                    context: context(),
                }
            })?),
            Handler::Previous => Route::Previous,
            Handler::Next => Route::Next,
            Handler::Remote => Route::Remote(remote::resolve(event)?),
            Handler::Disconnect => Route::Disconnect,
        })
    }
}
