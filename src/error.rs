//! Errors raised at the request/CLI boundary.
//!
//! The projection and comparison engines are infallible; everything here is about
//! turning caller input into a [`Scenario`](crate::core::Scenario).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fractions sum to {sum:.2}%, not 100%. Please fix them.")]
    FractionSum { sum: f64 },

    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid scenario payload: {0}")]
    InvalidPayload(String),

    #[error("No scenarios to compare")]
    EmptyScenarioSet,

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
