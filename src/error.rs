//! Error types for the Quarry library.
//!
//! All fallible operations return [`Result`], which carries a
//! [`QuarryError`]. The variants follow the retrieval subsystem's error
//! taxonomy: not-found, configuration, network, and processing failures,
//! plus conversions for I/O and JSON errors raised by the storage layer.
//!
//! # Examples
//!
//! ```
//! use quarry::error::{QuarryError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(QuarryError::configuration("pool size must be non-zero"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Quarry operations.
///
/// Uses the `thiserror` crate for automatic `Error` trait implementation
/// and provides convenient constructor methods for the common variants.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// I/O errors (file operations, registry persistence, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required id or resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad connection parameters, limits, or store configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fetch or connection failures, including blocked-range rejections.
    #[error("Network error: {0}")]
    Network(String),

    /// Extraction or parsing failures.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Storage-layer errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Query parsing or invalid query errors.
    #[error("Query error: {0}")]
    Query(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with QuarryError.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl QuarryError {
    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        QuarryError::NotFound(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        QuarryError::Configuration(msg.into())
    }

    /// Create a new network error.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        QuarryError::Network(msg.into())
    }

    /// Create a new processing error.
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        QuarryError::Processing(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        QuarryError::Storage(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        QuarryError::Query(msg.into())
    }

    /// Create a blocked-range rejection for SSRF-protected fetches.
    pub fn blocked_range<S: Into<String>>(url: S, range: S) -> Self {
        QuarryError::Network(format!(
            "refusing to fetch {}: address is in blocked range {}",
            url.into(),
            range.into()
        ))
    }
}
