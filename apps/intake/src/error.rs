//! # Application Errors
//!
//! Everything the CLI and server can fail with. Core errors pass through
//! unchanged; the app adds configuration, I/O and backend failures.

use crate::client::ClientError;
use intake_core::{GateBlock, IntakeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The step gate refused the transition.
    #[error("{0}")]
    Gate(#[from] GateBlock),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<intake_core::CacheError> for AppError {
    fn from(e: intake_core::CacheError) -> Self {
        Self::Intake(IntakeError::Cache(e))
    }
}

impl From<intake_core::TimelineError> for AppError {
    fn from(e: intake_core::TimelineError) -> Self {
        Self::Intake(IntakeError::Timeline(e))
    }
}
