//! Error types for API request execution

/// Errors from signed request execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session repair or signing failed
    #[error("session error: {0}")]
    Session(#[from] audible_auth::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Result alias for request execution.
pub type Result<T> = std::result::Result<T, Error>;
