//! Error types for the Netizmo profile core

use thiserror::Error;

/// Error raised by the profile store and its backing storage.
///
/// Absence of the profile record is not an error: `fetch_mine` reports it as
/// `Ok(None)`. Everything here is a real failure the user may retry.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No account is bound to this device
    #[error("Not authenticated: no account is bound to the private store")]
    NotAuthenticated,

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record references an asset that is not in the asset table
    #[error("Missing asset: {0}")]
    MissingAsset(String),

    /// Transport-level failure talking to the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// A record exists but cannot be turned into a valid profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// A required field is not present
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but holds the wrong kind of value
    #[error("Field {field} has the wrong shape: expected {expected}, found {found}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The image asset is not a supported image
    #[error("Invalid profile image: {0}")]
    InvalidImage(String),
}

/// Rejection of image bytes offered as a profile image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Image data is empty
    #[error("Image data is empty")]
    Empty,

    /// Image exceeds the configured size cap
    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Bytes are not a PNG, JPEG or WebP image
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}
