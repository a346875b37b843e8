//! Error kinds for the crate, per the error handling design: parse errors and
//! I/O errors are ordinary, recoverable `Result` values; an invariant
//! violation inside the sweep is a bug and is never silently swallowed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrateError {
    #[error("line {line}: expected 4 whitespace-separated numeric fields (p0 p1 q0 q1), got {found:?}")]
    Parse { line: usize, found: String },

    #[error("sweep status/queue invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrateError>;
