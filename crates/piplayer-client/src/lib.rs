//! Client-side synchronisation core for the pi-player surfaces.
//!
//! Push channel → message router → {remote router | playback engine |
//! playlist store} → (optionally) command channel → server of record.

pub mod command;
pub mod engine;
pub mod error;
pub mod playlist;
pub mod push;
pub mod remote;
pub mod render;
pub mod router;
pub mod selection;
pub mod session;
pub mod timer;

#[cfg(test)]
mod testing;

pub use error::{PlaybackError, TransportError};
pub use session::{Session, SessionEvent, SessionOptions, SessionUpdate};
