//! ## Custom Errors for Tabular Transformers
//!
//! This module defines the error type shared by every transformer and metric in the crate.
//! It uses the `thiserror` crate to derive the `Error` trait. Errors from DataFusion and Arrow
//! are wrapped as-is so that planning and execution failures reach the caller unchanged.
//!
//! The `TabularResult` type alias simplifies signatures throughout the library.
//!
//! ### Example
//!
//! ```rust
//! use tabular_transformers::exceptions::{TabularError, TabularResult};
//!
//! fn require_column() -> TabularResult<()> {
//!     Err(TabularError::MissingColumn("Column 'age' not found in DataFrame".into()))
//! }
//! ```

use thiserror::Error;

/// Errors specific to the Tabular Transformers library.
#[derive(Debug, Error)]
pub enum TabularError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Indicates that an invalid parameter was provided (e.g., out-of-range threshold or incorrect data type).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates that a label outside the binary domain {0, 1} was passed to a metric.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// Indicates that two label vectors passed to a metric have different lengths.
    #[error("Length mismatch: expected {expected} labels, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Indicates the transform method was called before calling fit.
    #[error("Transform called before fit")]
    FitNotCalled,
}

/// A convenient result type for Tabular Transformers operations.
pub type TabularResult<T> = std::result::Result<T, TabularError>;
