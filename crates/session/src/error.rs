/// Failures of a single gateway call as seen by the session driver.
///
/// The driver never propagates these; it records their display text in
/// [`crate::SessionState::error`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The gateway answered the call with `ok: false`.
    #[error("{message}")]
    Remote { code: String, message: String },

    /// The channel could not deliver the call or its response.
    #[error("{0}")]
    Transport(String),

    #[error("invalid {method} result: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
