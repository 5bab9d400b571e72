use thiserror::Error;

/// Malformed or unrecognised protocol input.  Never fatal: callers log and drop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtoError {
    #[error("unknown component: {0:?}")]
    UnknownComponent(String),
    #[error("unsupported {component}.{method}")]
    UnsupportedMethod { component: String, method: String },
    #[error("unknown key: {0:?}")]
    UnknownKey(String),
    #[error("missing or invalid argument {name:?} for {context}")]
    BadArgument { name: &'static str, context: String },
    #[error("unsupported file type {extension:?} for {file:?}")]
    UnsupportedExtension { file: String, extension: String },
}
