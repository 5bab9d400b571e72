//! Media asset addressing: where a filename is served from and how its
//! extension decides the rendering primitive.

use crate::error::ProtoError;

pub const CONTENT_PREFIX: &str = "/content/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

pub fn content_path(filename: &str) -> String {
    format!("{}{}", CONTENT_PREFIX, filename)
}

/// Lower-cased extension including the leading dot, or an empty string.
pub fn extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn classify(filename: &str) -> Result<MediaKind, ProtoError> {
    let ext = extension(filename);
    match ext.as_str() {
        ".mp4" | ".webm" => Ok(MediaKind::Video),
        ".jpg" | ".jpeg" | ".png" => Ok(MediaKind::Image),
        ".mp3" => Ok(MediaKind::Audio),
        _ => Err(ProtoError::UnsupportedExtension {
            file: filename.to_string(),
            extension: ext,
        }),
    }
}
