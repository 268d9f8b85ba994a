//! Symbolic and explicit reachability analysis for 1-safe Petri nets.
//!
//! The net model feeds both the explicit explorer (validation, small nets) and the
//! symbolic reachability engine; the BDD produced by symbolic reachability is in turn
//! consumed by the deadlock finder and the optimizer. [`report::analyze`] wires the whole
//! pipeline together for one net.
//!
//! PNML parsing, CLI invocation and report formatting, choice of LP solver backend, and
//! the weight vector are all external collaborators — see [`net::RawNetInput`] and
//! [`optimizer::lp::LpSolver`] for the contracts this crate expects of them.

pub mod bdd;
pub mod config;
pub mod deadlock;
pub mod error;
pub mod explicit;
pub mod net;
pub mod optimizer;
pub mod report;
pub mod symbolic;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use net::{Net, PlaceId, RawNetInput, TransitionId};
pub use report::{analyze, AnalysisReport};
