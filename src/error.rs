//! Errors callers are expected to match on

use thiserror::Error;

/// Reasons a prediction run or a report cannot be produced
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The predictor artifact was not loaded; the run is refused
    #[error("SYSTEM HALT: predictor artifact '{0}' is absent. Cannot initialize the churn model.")]
    ModelUnavailable(String),

    /// A report was requested before any prediction ran
    #[error("Execute the churn engine first: no prediction has been recorded in this session")]
    NoPrediction,
}
