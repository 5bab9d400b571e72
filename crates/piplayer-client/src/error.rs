use thiserror::Error;

/// A playback request that could not be honoured.  The operation is aborted
/// and neither `currentIndex` nor `highlightedIndex` changes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("index {index} out of range for playlist of {len} items")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("playlist is empty")]
    EmptyPlaylist,
    #[error("unsupported media {file:?} ({extension})")]
    UnsupportedMedia { file: String, extension: String },
}

/// Failure of either transport.  Push failures are retried by the channel;
/// command failures are not.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed push frame: {0}")]
    Frame(#[from] serde_json::Error),
}
