//! Core error types for mindgate-core.
//!
//! One top-level [`CoreError`] wraps the per-concern enums below. Upstream
//! usage failures ([`UsageError`]) are normally absorbed by the context
//! builder; they only appear here so providers have a typed error to return.

use std::path::PathBuf;
use thiserror::Error;

use crate::content::ContentCategory;

/// Core error type for mindgate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors (fatal, caught at startup validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The outcome log rejected a write; the shown content still stands
    #[error("Failed to record outcome: {0}")]
    OutcomeWrite(#[source] StoreError),

    /// Reading from the outcome log failed
    #[error("Outcome store error: {0}")]
    Store(#[from] StoreError),

    /// A decision was reported for a session that has no recorded show
    #[error("No intervention was shown for session '{session_id}'")]
    DecisionWithoutShow { session_id: String },

    /// The reported instance id differs from the one shown for the session
    #[error("Session '{session_id}' was shown '{shown}', not '{reported}'")]
    InstanceMismatch {
        session_id: String,
        shown: String,
        reported: String,
    },

    /// The latest show for this session already has a decision
    #[error("A decision was already recorded for show '{show_id}'")]
    DuplicateDecision { show_id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A required content category has no instances in the catalog
    #[error("Content catalog has no instances for required category {0:?}")]
    MissingCategory(ContentCategory),

    /// Two catalog entries share an id
    #[error("Content catalog contains duplicate instance id '{0}'")]
    DuplicateInstanceId(String),

    /// A catalog entry is malformed
    #[error("Content instance '{id}' is invalid: {message}")]
    InvalidInstance { id: String, message: String },
}

/// Outcome log errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt record '{id}': {message}")]
    Corrupt { id: String, message: String },

    /// The record id already exists in the log
    #[error("Record '{0}' already exists")]
    Duplicate(String),

    /// An in-memory lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Failures of the usage-history provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The provider could not be reached or timed out
    #[error("Usage history unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with data that could not be interpreted
    #[error("Malformed usage data for '{field}': {message}")]
    Malformed { field: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StoreError::Locked
                }
                _ => StoreError::QueryFailed(err.to_string()),
            },
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
