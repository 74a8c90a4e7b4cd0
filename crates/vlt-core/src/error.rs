//! Error currency of the VLT crates.
//!
//! Failures fall into two families. Structural problems (an unparseable
//! dataset row, non-dense vehicle ids, a derating quantile outside its
//! range) refuse the operation outright and surface here. Operational
//! shortfalls (a realised truck smaller than planned, a vehicle missing its
//! due date) are not errors at all: the planner absorbs them into the
//! assignment as delays and only the objective records the damage.
//!
//! [`VltError::Solver`] sits in between. An unroutable commodity aborts a
//! deterministic run, but the rolling scheduler merely logs it and retries
//! the affected vehicles the next day.

use thiserror::Error;

/// What can go wrong across ingestion, planning and persistence.
#[derive(Error, Debug)]
pub enum VltError {
    /// A dataset row or artifact that could not be decoded: a bad location
    /// code, a negative capacity, a timestamp in the wrong format, corrupt
    /// artifact JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Decoded fine but inconsistent: vehicle ids with gaps, a truck that
    /// falls outside the planning horizon, a vehicle due before it exists.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A knob set to a value it cannot take, e.g. a quantile outside
    /// [0, 1] or a negative stddev factor.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The min-cost-flow or MIP backend could not route a commodity's
    /// demand through the remaining capacity.
    #[error("Solver error: {0}")]
    Solver(String),

    /// File-system trouble while reading datasets or writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using VltError.
pub type VltResult<T> = Result<T, VltError>;

// Artifact (de)serialization goes through serde_json; a corrupt artifact
// is a parse failure like any other.
impl From<serde_json::Error> for VltError {
    fn from(err: serde_json::Error) -> Self {
        VltError::Parse(err.to_string())
    }
}
