//! Error types
//!
//! None of these ever stop the monitoring loop. Source, assessment and
//! notification errors are logged where they occur and absorbed.

/// Failure reading from an external collaborator (weather, equipment,
/// location, geo reference, crew roster).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Source timed out after {0}ms")]
    Timeout(u64),

    #[error("Malformed source data: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Remote assessment errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssessmentError {
    #[error("Remote assessment is disabled")]
    Disabled,

    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote assessment returned HTTP {status}")]
    Http { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Notification delivery errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notification channel closed")]
    Closed,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Lifecycle errors from the monitor's host API
#[derive(Debug, Clone, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor has been stopped")]
    Stopped,
}
