//! Error types for session and login operations

/// Errors from login, registration, and token operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("login failed: {0}")]
    Login(String),

    #[error("captcha rejected: {0}")]
    Captcha(String),

    #[error("one-time password rejected: {0}")]
    Mfa(String),

    #[error("device registration failed: {0}")]
    Registration(String),

    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("session no longer recoverable: {0}")]
    FatalSession(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("crypto operation failed: {0}")]
    Crypto(String),

    #[error("session parse error: {0}")]
    SessionParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
