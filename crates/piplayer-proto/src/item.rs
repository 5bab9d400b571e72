use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::media::{self, MediaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

/// Per-item playback policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cues {
    /// Auto-advance after this many seconds.  Zero is treated as unset.
    #[serde(default, alias = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Stop companion audio when this item starts.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_audio: bool,
}

impl Cues {
    pub fn auto_advance(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Overlay `other` onto `self`; set fields in `other` win.
    pub fn merge(&mut self, other: &Cues) {
        if other.timeout_seconds.is_some() {
            self.timeout_seconds = other.timeout_seconds;
        }
        if other.clear_audio {
            self.clear_audio = true;
        }
    }
}

/// One entry of the canonical playlist.  Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(alias = "Visual")]
    pub visual: String,
    #[serde(default, alias = "Audio")]
    pub audio: String,
    #[serde(default, alias = "Type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, alias = "Cues")]
    pub cues: Cues,
}

impl PlaylistItem {
    pub fn new(visual: impl Into<String>) -> Self {
        Self {
            visual: visual.into(),
            audio: String::new(),
            media_type: None,
            cues: Cues::default(),
        }
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = audio.into();
        self
    }

    pub fn with_cues(mut self, cues: Cues) -> Self {
        self.cues = cues;
        self
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }

    /// How the visual asset must be rendered, decided by its extension.
    pub fn visual_kind(&self) -> Result<MediaType, ProtoError> {
        match media::classify(&self.visual)? {
            MediaKind::Video => Ok(MediaType::Video),
            MediaKind::Image => Ok(MediaType::Image),
            MediaKind::Audio => Err(ProtoError::UnsupportedExtension {
                file: self.visual.clone(),
                extension: media::extension(&self.visual),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_decodes_camel_case() {
        let item: PlaylistItem = serde_json::from_str(
            r#"{"visual":"b.mp4","mediaType":"video","cues":{"timeoutSeconds":5}}"#,
        )
        .unwrap();
        assert_eq!(item.visual, "b.mp4");
        assert_eq!(item.audio, "");
        assert_eq!(item.media_type, Some(MediaType::Video));
        assert_eq!(item.cues.auto_advance(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_item_decodes_legacy_names() {
        let item: PlaylistItem =
            serde_json::from_str(r#"{"Visual":"slide.png","Audio":"slide.mp3"}"#).unwrap();
        assert_eq!(item.visual, "slide.png");
        assert!(item.has_audio());
        assert!(!item.cues.clear_audio);
    }

    #[test]
    fn test_zero_timeout_is_unset() {
        let cues = Cues {
            timeout_seconds: Some(0),
            clear_audio: false,
        };
        assert_eq!(cues.auto_advance(), None);
    }

    #[test]
    fn test_visual_kind() {
        assert_eq!(PlaylistItem::new("a.JPG").visual_kind(), Ok(MediaType::Image));
        assert_eq!(PlaylistItem::new("a.webm").visual_kind(), Ok(MediaType::Video));
        assert!(PlaylistItem::new("a.mp3").visual_kind().is_err());
        assert!(PlaylistItem::new("a.gif").visual_kind().is_err());
    }

    #[test]
    fn test_cues_merge() {
        let mut base = Cues {
            timeout_seconds: Some(3),
            clear_audio: false,
        };
        base.merge(&Cues {
            timeout_seconds: None,
            clear_audio: true,
        });
        assert_eq!(base.timeout_seconds, Some(3));
        assert!(base.clear_audio);
    }
}
