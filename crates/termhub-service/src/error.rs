//! Service error type.

use termhub_loader::{EngineError, LoadError};
use thiserror::Error;

/// Errors returned by [`TermhubService`](crate::TermhubService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The engine rejected the request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Source tables could not be read.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A codeset id list contained something other than integers.
    #[error("Invalid codeset id list: {value:?}")]
    InvalidCodesetIds {
        /// The rejected input.
        value: String,
    },
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
