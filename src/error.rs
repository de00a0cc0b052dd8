//! Error types for the reply seam

use std::time::Duration;
use thiserror::Error;

/// Why a reply could not be produced
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Responder unavailable: {0}")]
    Unavailable(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),
}
