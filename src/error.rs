//! Error types for concarne

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<Option<usize>>,
        got: Vec<Option<usize>>,
    },

    #[error("Missing variable: {0} is required by this pattern")]
    MissingVariable(&'static str),

    #[error("Missing loss: {0} loss has not been built")]
    MissingLoss(&'static str),

    #[error("Not implemented: {0} must be provided by a concrete pattern")]
    NotImplemented(&'static str),

    #[error("Input count mismatch: expected {expected} values, got {got}")]
    InputCountMismatch { expected: usize, got: usize },

    #[error("Unknown input dimension: network {0} has no known feature count to size a layer from")]
    UnknownInputDim(String),

    #[error("Empty operand: {0} needs at least one element")]
    EmptyOperand(&'static str),

    #[error("Unbound variable: no value fed for '{0}'")]
    UnboundVariable(String),

    #[error("Unknown objective: {0}")]
    UnknownObjective(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
