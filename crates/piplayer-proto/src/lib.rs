pub mod config;
pub mod error;
pub mod item;
pub mod keys;
pub mod media;
pub mod platform;
pub mod protocol;
pub mod surface;

pub use error::ProtoError;
