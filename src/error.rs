//! Errors raised by unit parsing, conversion and quantity arithmetic.

use thiserror::Error;

use crate::{dimension::DimensionVector, fract::FracError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantityError {
    #[error("Cannot parse unit: {0}")]
    UnitParseError(String),
    #[error("Unknown unit: {0}")]
    UnitNotFoundError(String),
    #[error("Cannot convert from {from} ({from_dim}) to {to} ({to_dim})")]
    DimensionalityError {
        from: String,
        to: String,
        from_dim: DimensionVector,
        to_dim: DimensionVector,
    },
    #[error("Invalid operation: {0}")]
    OperationError(String),
    #[error("Cannot compare {0}")]
    ComparisonError(String),
    #[error("Invalid value: {0}")]
    InvalidValueError(String),
    #[error("Array error: {0}")]
    ArrayError(String),
}

impl From<FracError> for QuantityError {
    fn from(value: FracError) -> Self {
        QuantityError::UnitParseError(value.to_string())
    }
}
