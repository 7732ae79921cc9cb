//! Error types for teampulse-core

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// Configuration deserialized but failed a validation rule.
    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from parsing a date-range spec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The spec did not match any accepted form, or start > end.
    #[error("invalid date range {spec:?}: {reason}")]
    Invalid {
        /// The spec string as given.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type alias using [`RangeError`].
pub type RangeResult<T> = Result<T, RangeError>;

/// Errors raised while collecting from an upstream API.
///
/// The distinction between [`CollectError::Transient`] and
/// [`CollectError::Permanent`] drives retry behavior: transient errors are
/// retried up to the configured bound, permanent errors are recorded and the
/// surrounding layer moves on. Rate-limit responses (403/429) are normalized
/// to `Transient` before the retry loop sees them.
#[derive(Error, Debug)]
pub enum CollectError {
    /// 5xx, 429/403 rate limiting, or a transport failure. Retriable.
    #[error("transient upstream error ({context}): {message}")]
    Transient {
        /// Which query failed.
        context: String,
        /// Status code when the upstream answered at all.
        status: Option<u16>,
        /// Underlying message.
        message: String,
    },

    /// 4xx other than rate limits, or an authentication failure.
    #[error("permanent upstream error ({context}): {message}")]
    Permanent {
        /// Which query failed.
        context: String,
        /// HTTP status code.
        status: Option<u16>,
        /// Underlying message.
        message: String,
    },

    /// The upstream response could not be decoded.
    #[error("malformed upstream response ({context}): {message}")]
    Decode {
        /// Which query produced the response.
        context: String,
        /// Parse failure detail.
        message: String,
    },

    /// Cooperative cancellation was observed.
    #[error("collection cancelled")]
    Cancelled,
}

impl CollectError {
    /// Whether the retry loop should try again.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Classify an HTTP status into the taxonomy.
    ///
    /// 403 and 429 are secondary rate limits on the source-control host and
    /// overload signals on the tracker; both retry with a longer backoff.
    pub fn from_status(context: &str, status: u16, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        if status >= 500 || status == 429 || status == 403 {
            Self::Transient {
                context: context.to_string(),
                status: Some(status),
                message,
            }
        } else {
            Self::Permanent {
                context: context.to_string(),
                status: Some(status),
                message,
            }
        }
    }

    /// Wrap a reqwest transport error (connect/timeout/body) as transient.
    pub fn transport(context: &str, err: &reqwest::Error) -> Self {
        Self::Transient {
            context: context.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Result type alias using [`CollectError`].
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors from the snapshot store.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file held something other than a snapshot.
    #[error("snapshot decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// No snapshot exists for the requested (range, environment).
    #[error("no snapshot for range {range} env {env}")]
    NotFound {
        /// Requested range label.
        range: String,
        /// Requested environment.
        env: String,
    },

    /// The pre-write validation check refused the snapshot.
    ///
    /// Any prior snapshot on disk is left untouched.
    #[error("snapshot rejected: {0}")]
    Validation(String),
}

/// Result type alias using [`SnapshotError`].
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Top-level pipeline failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration problem discovered after startup (unknown environment).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The date-range spec was rejected.
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Snapshot write or validation failure.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An upstream client could not even be constructed.
    #[error("collector startup failed: {0}")]
    Startup(String),

    /// The run was cancelled before a snapshot was sealed.
    #[error("collection run cancelled")]
    Cancelled,
}

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;
