//! Error types for the lorebook drawer.
//!
//! This module defines the centralized error type [`DrawerError`] and a type alias
//! [`Result`] used throughout the crate. Host I/O failures, malformed book files,
//! configuration problems and missing view anchors all funnel into this one enum
//! so that the event handler can propagate them with `?`.

use thiserror::Error;

/// The main error type for drawer operations.
///
/// Most variants carry a description; the I/O and JSON variants wrap the
/// underlying error via `#[from]` so call sites can use `?` directly.
///
/// # Examples
///
/// ```
/// use lorebook_drawer::DrawerError;
///
/// fn lookup(name: &str) -> Result<(), DrawerError> {
///     Err(DrawerError::UnknownBook(name.to_string()))
/// }
///
/// assert!(lookup("Lore").is_err());
/// ```
#[derive(Debug, Error)]
pub enum DrawerError {
    /// The host rejected a load, save, create or delete request.
    #[error("Host error: {0}")]
    Host(String),

    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A book file, preference value or filter input could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration is invalid or could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation named a book that is not in the cache.
    #[error("Unknown book: {0}")]
    UnknownBook(String),

    /// An operation named an entry that is not cached for its book.
    #[error("Unknown entry {uid} in book {book}")]
    UnknownEntry {
        /// Book the entry was looked up in.
        book: String,
        /// Identifier that was not found.
        uid: String,
    },

    /// A view handle no longer refers to a live node.
    ///
    /// Aborts the render or reconcile pass that needed the node; changes
    /// already applied by that pass are kept.
    #[error("Missing view node: {0}")]
    MissingNode(String),

    /// The filter script engine failed to compile or evaluate a script.
    #[error("Script error: {0}")]
    Script(String),
}

/// A specialized `Result` type for drawer operations.
pub type Result<T> = std::result::Result<T, DrawerError>;

impl From<toml::de::Error> for DrawerError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.message().to_string())
    }
}
