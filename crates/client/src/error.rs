use wizard_common::FromMessage;

/// Errors specific to the gateway client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// The gateway answered with `ok: false`.
    #[error("{message}")]
    Remote { code: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Config(message)
    }
}

impl From<Error> for wizard_session::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Remote { code, message } => Self::Remote { code, message },
            other => Self::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

wizard_common::impl_context!();
