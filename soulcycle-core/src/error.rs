//! Error types for the Soul-Cycle core library.
//!
//! Only the write path produces errors. Reading, parsing and migrating a
//! stored profile never fails: malformed data degrades to defaults instead.

use thiserror::Error;

/// Top-level error type for profile persistence.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The profile could not be encoded, so nothing was written.
    #[error("Failed to serialize profile: {0}")]
    Serialization(String),

    /// The key-value backend rejected a write.
    #[error("Failed to write profile: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A storage backend failed for a reason other than SQLite.
    #[error("Failed to write profile: {0}")]
    Backend(String),

    /// Configuration or content tables could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ProfileError>;
