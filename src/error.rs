//! Error types for trueno-experiment
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Only construction-time problems are errors. `Runner::run` never fails:
//! behaviour errors are recorded on their `Observation` and candidate panics
//! are captured there too.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Experiment error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment built without a name
    #[error("Experiment name is required\nPass a non-empty name to `Experiment::builder`")]
    NoName,

    /// Sampling percentage outside 0..=100
    #[error("Invalid percentage: {0}\nPercentage must be between 0 and 100")]
    InvalidPercentage(u8),

    /// Candidate registered under the control's reserved name
    #[error("Behaviour name \"control\" is reserved for the control behaviour")]
    ReservedName,

    /// Candidate registered with an empty name
    #[error("Behaviour name must not be empty")]
    EmptyBehaviourName,

    /// Two candidates registered under the same name
    #[error("Behaviour already registered: {0}")]
    DuplicateBehaviour(String),

    /// `evaluate`/`publish` called on an experiment without a comparison
    #[error("No comparison configured\nUse `ExperimentBuilder::compare` to evaluate observations")]
    MissingComparison,

    /// Observation set without a control entry
    #[error("Observation set has no control entry")]
    MissingControl,

    /// Evaluation serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
