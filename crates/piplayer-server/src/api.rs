//! `POST /api`: one JSON command in, one JSON response out.
//!
//! Playlist calls are answered from the library.  Player calls are relayed
//! to the viewer surface as push events; the viewer owns playback.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use piplayer_proto::keys::Key;
use piplayer_proto::protocol::{Component, PushEvent, Response};
use piplayer_proto::surface::Surface;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Seconds moved by the short and long seek commands.
const SHORT_SEEK_SECS: i64 = 30;
const LONG_SEEK_SECS: i64 = 600;

/// Commands are decoded loosely so that an unknown component still gets a
/// `{success:false}` answer instead of a rejected request.
#[derive(Debug, Deserialize)]
struct ApiRequest {
    component: String,
    method: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

pub async fn api_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Response> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));
    if !is_json {
        warn!("api: rejected request without a JSON content type");
        return Json(Response::failure("Content-Type must be application/json"));
    }

    let request: ApiRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("api: undecodable body: {}", e);
            return Json(Response::failure(format!("Could not decode message: {}", e)));
        }
    };
    debug!("api: {}.{} {:?}", request.component, request.method, request.arguments);
    Json(dispatch(&state, request).await)
}

async fn dispatch(state: &AppState, request: ApiRequest) -> Response {
    let Ok(component) = Component::parse(&request.component) else {
        return unsupported(&request);
    };
    let args = &request.arguments;
    match (component, request.method.as_str()) {
        (Component::Playlist, "getItems") => get_items(state).await,
        (Component::Playlist, "getCurrent") => get_current(state).await,
        (Component::Playlist, "setCurrent") => set_current(state, args).await,
        (Component::Player, "start") => start(state, args).await,
        (Component::Player, "sendCommand") => send_command(state, args).await,
        (Component::Player, "seek") => match int_arg(args, "value") {
            Some(value) => relay(state, seek_event(value)).await,
            None => Response::failure("No seek value provided."),
        },
        (Component::Player, method @ ("stop" | "play" | "pause" | "previous" | "next")) => {
            relay(state, PushEvent::new(Component::Player, method)).await
        }
        _ => unsupported(&request),
    }
}

fn unsupported(request: &ApiRequest) -> Response {
    warn!("api: unsupported {}.{}", request.component, request.method);
    Response::failure("Method not supported")
}

async fn get_items(state: &AppState) -> Response {
    match state.reload().await {
        Ok(items) => match serde_json::to_value(&items) {
            Ok(value) => Response::ok(value).with_event("items"),
            Err(e) => Response::failure(e.to_string()),
        },
        Err(e) => {
            warn!("api: getItems failed: {}", e);
            Response::failure(e.to_string())
        }
    }
}

async fn get_current(state: &AppState) -> Response {
    let library = state.library.read().await;
    match library.current_item() {
        Some(item) => Response::ok(item.visual.clone()).with_event("current"),
        None => Response::ok(Value::Null).with_event("noCurrent"),
    }
}

async fn set_current(state: &AppState, args: &Map<String, Value>) -> Response {
    let Some(index) = int_arg(args, "index") else {
        return Response::failure("No index supplied").with_event("noArgumentSupplied");
    };
    {
        let mut library = state.library.write().await;
        let Some(index) = usize::try_from(index).ok().filter(|i| *i < library.items.len()) else {
            return Response::failure(format!("Index {} out of range", index))
                .with_event("argumentInvalid");
        };
        library.current = Some(index);
    }
    info!("api: current index set to {}", index);

    // The control surface follows the canonical index.
    let echo = PushEvent::new(Component::Playlist, "setCurrent").with_message(index);
    state.hub.push(Surface::Control, echo).await;
    Response::ok(index).with_event("setCurrent")
}

async fn start(state: &AppState, args: &Map<String, Value>) -> Response {
    let (index, visual) = {
        let library = state.library.read().await;
        let index = match int_arg(args, "index") {
            Some(i) => usize::try_from(i).ok(),
            None => args
                .get("path")
                .and_then(Value::as_str)
                .and_then(|path| library.index_of(path)),
        };
        match index.and_then(|i| library.items.get(i).map(|item| (i, item.visual.clone()))) {
            Some(found) => found,
            None => {
                return Response::failure(
                    "Trying to play an item that's not in the playlist",
                )
            }
        }
    };

    let event = PushEvent::new(Component::Player, "start")
        .with_argument("path", visual.clone())
        .with_argument("index", index);
    if !state.hub.push(Surface::Viewer, event).await {
        return Response::failure("Viewer not connected");
    }
    Response::ok(visual).with_event("videoStarted")
}

async fn send_command(state: &AppState, args: &Map<String, Value>) -> Response {
    let Some(name) = args.get("command").and_then(Value::as_str) else {
        return Response::failure("No command sent.");
    };
    let Some(event) = translate_command(name) else {
        return Response::failure(format!("Command not found: {}", name));
    };
    let res = relay(state, event).await;
    if res.success {
        Response::ok("Command sent and executed")
    } else {
        res
    }
}

/// Map the legacy player command names onto viewer push events.
pub fn translate_command(name: &str) -> Option<PushEvent> {
    Some(match name {
        "pauseResume" => PushEvent::new(Component::Remote, "keyDown")
            .with_argument("keyString", Key::PlayPause.as_str()),
        "quit" | "exit" => PushEvent::new(Component::Player, "stop"),
        "fastForward" | "seekForward30" => seek_event(SHORT_SEEK_SECS),
        "rewind" | "seekBack30" => seek_event(-SHORT_SEEK_SECS),
        "seekForward600" => seek_event(LONG_SEEK_SECS),
        "seekBack600" => seek_event(-LONG_SEEK_SECS),
        "chapterNext" => PushEvent::new(Component::Player, "next"),
        "chapterPrevious" => PushEvent::new(Component::Player, "previous"),
        _ => return None,
    })
}

fn seek_event(value: i64) -> PushEvent {
    PushEvent::new(Component::Player, "seek").with_argument("value", value)
}

async fn relay(state: &AppState, event: PushEvent) -> Response {
    let label = format!("{}.{}", event.component, event.event);
    if state.hub.push(Surface::Viewer, event).await {
        debug!("api: relayed {} to viewer", label);
        Response::ok(Value::Null)
    } else {
        Response::failure("Viewer not connected")
    }
}

fn int_arg(args: &Map<String, Value>, name: &str) -> Option<i64> {
    match args.get(name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
