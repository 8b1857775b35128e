//! Error types for plumbline table reconstruction.

use thiserror::Error;

/// Primary error type for table reconstruction.
///
/// Geometric dead ends (no edges, no crossings, no tables) are not errors;
/// they produce empty results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("invalid table settings: {0}")]
    Validation(String),

    #[error("table index {index} out of range ({count} tables on page)")]
    Index { index: isize, count: usize },
}

/// Convenience Result type alias for TableError.
pub type Result<T> = std::result::Result<T, TableError>;
