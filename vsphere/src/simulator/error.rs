use thiserror::Error;
use tfacc::TfaccError;

use super::Operation;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Failed to parse configuration (line {line}): {message}")]
    ParseError { line: usize, message: String },

    #[error("Unsupported resource type '{0}'")]
    UnsupportedResource(String),

    #[error("Missing required argument '{argument}' in {address}")]
    MissingArgument { address: String, argument: String },

    #[error("The name '{0}' already exists")]
    DuplicateName(String),

    #[error("{operation} failed: {message}")]
    Injected {
        operation: Operation,
        message: String,
    },
}

impl From<regex::Error> for SimulatorError {
    fn from(err: regex::Error) -> Self {
        SimulatorError::ParseError {
            line: 0,
            message: err.to_string(),
        }
    }
}

/// Surfaces as a transport error once the runner tags it with an operation
impl From<SimulatorError> for TfaccError {
    fn from(err: SimulatorError) -> Self {
        TfaccError::Custom(err.to_string())
    }
}
