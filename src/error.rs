//! Error types for Mudae Assist.

/// Top-level error type for the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors surfaced by the Discord transport, classified from the
/// returned HTTP status.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Network or HTTP failure. Non-fatal: the executor skips the action.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// 429-equivalent. Non-fatal; no backoff beyond the configured pacing.
    #[error("Rate limited by Discord")]
    RateLimited { retry_after: Option<f64> },

    /// 401/403-equivalent. Fatal: the session transitions to Failed.
    #[error("Authorization rejected (status {status})")]
    Unauthorized { status: u16 },

    /// Malformed message/embed payload. Skip the message, keep polling.
    #[error("Malformed payload: {0}")]
    Parse(String),
}

impl TransportError {
    /// Whether this error must abort the whole session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Session lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A second `start` while a session is Running. Rejected synchronously,
    /// the running session is left untouched.
    #[error("A session is already running")]
    AlreadyRunning,
}

/// Result type alias for the orchestrator.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_fatal() {
        assert!(TransportError::Unauthorized { status: 403 }.is_fatal());
        assert!(TransportError::Unauthorized { status: 401 }.is_fatal());
    }

    #[test]
    fn transient_errors_are_not_fatal() {
        assert!(!TransportError::Http("connection reset".into()).is_fatal());
        assert!(!TransportError::RateLimited { retry_after: None }.is_fatal());
        assert!(!TransportError::Parse("missing field".into()).is_fatal());
    }
}
