//! Error types for frame transformations

use thiserror::Error;

/// Errors raised by the mutating operations of a frame transformation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A required end node was not supplied at initialization
    #[error("end node {0} of the frame transformation is missing")]
    InvalidNode(usize),

    /// Reference or deformed geometry cannot define a local frame
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Capability requested from a transformation that does not provide it
    #[error("{operation} is not supported by {transform}")]
    UnsupportedOperation {
        transform: &'static str,
        operation: &'static str,
    },

    /// Node-dependent operation called before `initialize`
    #[error("frame transformation used before initialize()")]
    Uninitialized,
}

/// Result type for frame transformation operations
pub type Result<T> = std::result::Result<T, TransformError>;
