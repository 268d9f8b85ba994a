//! Explicit, per-run configuration threaded into every core entry point: resource caps,
//! the cooperative cancel token, and the LP backend handle. Nothing here is global module
//! state — two concurrent analyses each get their own [`AnalysisConfig`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::optimizer::lp::{BoxBoundLpSolver, LpSolver};

/// Resource caps and tunables shared by every analysis component.
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Upper bound on live BDD nodes before an operation surfaces
    /// [`crate::error::Error::ResourceExhausted`].
    pub bdd_node_cap: usize,
    /// Upper bound on fixed-point image iterations in symbolic reachability, past which
    /// the component returns a cancelled-style outcome rather than looping forever on a
    /// pathological input.
    pub reachability_iteration_cap: usize,
    /// Upper bound on the number of cube completions the deadlock finder will evaluate
    /// before reporting truncation.
    pub deadlock_enum_cap: usize,
    /// Upper bound on branch-and-cut search nodes expanded by the optimizer.
    pub optimizer_node_cap: usize,
    /// Maximum number of candidate variable pairs tested for a mutex cut per node. The
    /// source limits itself to roughly 50 pair tests; there's no evidence a specific
    /// constant is semantically required, so this is exposed as a tunable rather than a
    /// hardcoded constant.
    pub mutex_cut_budget: usize,
    /// Checked cooperatively between outer iterations of every long-running loop.
    pub cancel: Arc<AtomicBool>,
    /// The optimizer's LP relaxation backend. Defaults to the crate's own
    /// [`BoxBoundLpSolver`]; swap in a real simplex/interior-point solver for tighter
    /// bounds.
    pub lp_solver: Arc<dyn LpSolver>,
}

impl AnalysisConfig {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            bdd_node_cap: 1_000_000,
            reachability_iteration_cap: 100_000,
            deadlock_enum_cap: 1_000_000,
            optimizer_node_cap: 1_000_000,
            mutex_cut_budget: 50,
            cancel: Arc::new(AtomicBool::new(false)),
            lp_solver: Arc::new(BoxBoundLpSolver),
        }
    }
}

impl std::fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("bdd_node_cap", &self.bdd_node_cap)
            .field("reachability_iteration_cap", &self.reachability_iteration_cap)
            .field("deadlock_enum_cap", &self.deadlock_enum_cap)
            .field("optimizer_node_cap", &self.optimizer_node_cap)
            .field("mutex_cut_budget", &self.mutex_cut_budget)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
