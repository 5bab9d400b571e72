//! Content folder scanning.
//!
//! Visual files become playlist items in name order.  An `.mp3` sharing a
//! visual's stem becomes its companion audio and an `.mp0` marker with the
//! same stem sets `clearAudio`.  `presentation.json` can add cues to items by
//! regex (or exact name when the pattern does not compile).

use std::path::{Path, PathBuf};

use piplayer_proto::item::{Cues, MediaType, PlaylistItem};
use piplayer_proto::media::{self, MediaKind};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const PRESENTATION_FILE: &str = "presentation.json";
const CLEAR_AUDIO_MARKER: &str = ".mp0";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content directory {0:?} does not exist")]
    MissingDir(PathBuf),
    #[error("reading content directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize)]
struct Presentation {
    #[serde(default, alias = "Items")]
    items: Vec<PresentationItem>,
}

#[derive(Debug, Deserialize)]
struct PresentationItem {
    #[serde(alias = "Visual")]
    visual: String,
    #[serde(default, alias = "Cues")]
    cues: Map<String, Value>,
}

pub fn scan(dir: &Path) -> Result<Vec<PlaylistItem>, ContentError> {
    if !dir.is_dir() {
        return Err(ContentError::MissingDir(dir.to_path_buf()));
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    let mut items: Vec<PlaylistItem> = names
        .iter()
        .filter_map(|name| match media::classify(name) {
            Ok(MediaKind::Video) => Some(typed(name, MediaType::Video)),
            Ok(MediaKind::Image) => Some(typed(name, MediaType::Image)),
            _ => None,
        })
        .collect();

    for name in &names {
        let ext = media::extension(name);
        if ext != ".mp3" && ext != CLEAR_AUDIO_MARKER {
            continue;
        }
        let base = stem(name);
        if let Some(item) = items.iter_mut().find(|item| stem(&item.visual) == base) {
            if ext == ".mp3" {
                item.audio = name.clone();
            } else {
                item.cues.clear_audio = true;
            }
        }
    }

    let presentation = dir.join(PRESENTATION_FILE);
    if presentation.is_file() {
        apply_presentation(&presentation, &mut items);
    }

    debug!("scanned {}: {} items", dir.display(), items.len());
    Ok(items)
}

fn typed(name: &str, media_type: MediaType) -> PlaylistItem {
    let mut item = PlaylistItem::new(name);
    item.media_type = Some(media_type);
    item
}

fn stem(name: &str) -> &str {
    let ext_len = media::extension(name).len();
    &name[..name.len() - ext_len]
}

fn apply_presentation(path: &Path, items: &mut [PlaylistItem]) {
    let presentation: Presentation = match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(p) => p,
        Err(e) => {
            warn!("ignoring {}: {}", path.display(), e);
            return;
        }
    };

    for entry in presentation.items {
        let cues = cues_from_map(&entry.cues);
        match Regex::new(&entry.visual) {
            Ok(re) => items
                .iter_mut()
                .filter(|item| re.is_match(&item.visual))
                .for_each(|item| item.cues.merge(&cues)),
            Err(_) => {
                warn!("presentation pattern {:?} is not a regex, matching by name", entry.visual);
                if let Some(item) = items.iter_mut().find(|item| item.visual == entry.visual) {
                    item.cues.merge(&cues);
                }
            }
        }
    }
}

/// Cue maps are loosely typed: `{"timeout": "5", "clear": "audio"}` and
/// `{"timeoutSeconds": 5, "clearAudio": true}` are both accepted.
pub fn cues_from_map(raw: &Map<String, Value>) -> Cues {
    let timeout_seconds = ["timeoutSeconds", "timeout"]
        .iter()
        .filter_map(|k| raw.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
    let clear_audio = raw.get("clearAudio").and_then(Value::as_bool).unwrap_or(false)
        || raw.get("clear").and_then(Value::as_str) == Some("audio");
    Cues {
        timeout_seconds,
        clear_audio,
    }
}
