//! Unified error types for helpdesk.
//!
//! Errors are split by who can act on them: input problems are reported back
//! to the supervisor without touching the store, conflicts and missing
//! documents are surfaced as-is, and store or reactor failures carry enough
//! classification for the caller (or the trigger runtime) to decide whether a
//! retry makes sense.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::HelpRequest;

/// The main error type for helpdesk operations.
#[derive(Error, Debug)]
pub enum HelpdeskError {
    /// Required supervisor input was empty or missing. No writes were issued.
    #[error("invalid input: {field} must not be empty")]
    InvalidInput { field: &'static str },

    /// The target help request does not exist.
    #[error("help request not found: {id}")]
    NotFound { id: String },

    /// The help request was already resolved by an earlier write.
    #[error("help request already resolved: {id}")]
    AlreadyResolved { id: String },

    /// A patch would break the status/response invariant.
    #[error("invalid transition for {id}: {message}")]
    InvalidTransition { id: String, message: String },

    /// The request was resolved but the dependent knowledge write failed.
    #[error("request {} resolved but knowledge entry was not recorded: {source}", request.id)]
    PartialFailure {
        request: Box<HelpRequest>,
        #[source]
        source: Box<HelpdeskError>,
    },

    /// The store reported a failure that may succeed on retry.
    #[error("transient store error: {message}")]
    TransientStore { message: String },

    /// The resolution trigger could not complete its side effects.
    #[error("reactor failure for {document_id}: {message}")]
    ReactorFailure {
        document_id: String,
        message: String,
    },

    /// The notification channel rejected a message.
    #[error("notify error: {message}")]
    Notify { message: String },

    /// A live view could not be drawn.
    #[error("render error: {message}")]
    Render { message: String },

    /// I/O errors from the file-backed store or config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for helpdesk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

impl HelpdeskError {
    /// Create an invalid input error for the named field.
    pub fn invalid_input(field: &'static str) -> Self {
        Self::InvalidInput { field }
    }

    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an already resolved error.
    pub fn already_resolved(id: impl Into<String>) -> Self {
        Self::AlreadyResolved { id: id.into() }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Wrap a knowledge write failure that happened after the request committed.
    pub fn partial_failure(request: HelpRequest, source: HelpdeskError) -> Self {
        Self::PartialFailure {
            request: Box::new(request),
            source: Box::new(source),
        }
    }

    /// Create a transient store error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientStore {
            message: message.into(),
        }
    }

    /// Create a reactor failure.
    pub fn reactor(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReactorFailure {
            document_id: document_id.into(),
            message: message.into(),
        }
    }

    /// Create a notify error.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
        }
    }

    /// Create a render error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore { .. } | Self::Storage { .. })
    }

    /// Whether the supervisor's answer was saved despite the error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }
}

impl From<serde_json::Error> for HelpdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for best-effort error handling.
///
/// Used where a failure should be logged and replaced by a fallback rather
/// than aborting the surrounding operation.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the helpdesk CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed and nothing was committed.
    pub const FAILURE: i32 = 1;

    /// The answer was saved but a dependent write failed.
    pub const PARTIAL: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
