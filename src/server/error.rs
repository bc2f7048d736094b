//! Error types for the server

use crate::error::PipelineError;
use thiserror::Error;

/// Failures that stop the server from starting
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Model unavailable: {0}")]
    Model(#[from] PipelineError),

    #[error("Feature layout error: {0}")]
    Layout(String),

    #[error("Invalid bind address: {0}")]
    Address(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
