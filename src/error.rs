//! Tagged error and outcome types for every fallible boundary of the analysis engine.
//!
//! Per the error handling design, only net malformation and resource exhaustion are
//! surfaced as an [`Error`]. Solver failures, cancellation, and truncated enumeration are
//! handled locally by each component and returned as a distinguished successful outcome
//! instead (see [`crate::symbolic::ReachabilityOutcome`], [`crate::deadlock::DeadlockReport`],
//! and [`crate::optimizer::OptimizerOutcome`]).

use thiserror::Error;

/// Errors that abort the current analysis outright.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A declared identifier was duplicated, or a marking component exceeded 1.
    #[error("net malformed: {0}")]
    NetMalformed(String),

    /// A BDD operation would exceed the configured node-table cap.
    #[error("resource exhausted: BDD node table cap of {cap} nodes would be exceeded")]
    ResourceExhausted { cap: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
