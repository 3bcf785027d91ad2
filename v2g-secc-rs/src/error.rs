//! Session-layer errors

use thiserror::Error;

use crate::controller::ControllerError;
use crate::rational::RationalError;

/// Errors raised while driving a charging session
#[derive(Debug, Error)]
pub enum SeccError {
    #[error("Fixed-point encoding failed: {0}")]
    Rational(#[from] RationalError),

    #[error("EVSE controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Missing {0} in data context")]
    MissingLimits(&'static str),

    #[error("Session {0} already terminated")]
    SessionTerminated(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SeccError>;
