//! # AppError
//!
//! Centralized error handling for the Palaver ecosystem.
//!
//! Empty results and permission denials are never errors here: invisible
//! data is silently filtered so callers cannot distinguish "doesn't exist"
//! from "exists but hidden".

use thiserror::Error;

/// The primary error type for all palaver-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., the place a discussion is filed under)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// A discussion failed to persist; fatal to the edit, raised before
    /// any counter increment or cache invalidation happens
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Infrastructure failure (e.g., storage or cache backend down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("{error:#}"))
    }
}

/// A specialized Result type for Palaver logic.
pub type Result<T> = std::result::Result<T, AppError>;
