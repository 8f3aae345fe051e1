/// Core error type.
///
/// Adapter crates map their specific errors into this type so the handlers
/// can treat failures consistently (user-facing reply vs logged and dropped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chat error: {0}")]
    Chat(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
