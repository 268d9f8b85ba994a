//! The reporting surface: the one orchestration entry point that ties the net model, the
//! explicit explorer, the BDD engine, symbolic reachability, the deadlock finder, and the
//! optimizer together into the outcome described in the external interfaces section.
//! Everything below this point in the dependency graph is a pure function of the net (and
//! the weight vector); nothing here persists state across calls.

use log::info;

use crate::bdd::ordering::VarOrder;
use crate::bdd::BddManager;
use crate::config::AnalysisConfig;
use crate::deadlock::DeadlockReport;
use crate::error::Result;
use crate::explicit::{self, Order};
use crate::net::Net;
use crate::optimizer::{self, OptimizerOutcome, Weights};
use crate::symbolic::{self, ReachabilityStatus};

/// Number of reachable markings as seen by each independent method. The two must agree
/// for any net small enough that the explicit explorer ran to completion; this is one of
/// the engine's universal invariants.
#[derive(Debug, Clone, Copy)]
pub struct ReachableCounts {
    pub explicit: Option<u64>,
    pub symbolic: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Completed,
    Cancelled,
}

/// Everything the orchestrator needs to report for one net: the two reachable-set
/// counts, the deadlock report, and (if weights were supplied) the optimizer's outcome.
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    pub reachable_counts: ReachableCounts,
    pub deadlocks: DeadlockReport,
    pub optimizer: Option<OptimizerOutcome>,
}

/// Run the full pipeline against `net`: explicit exploration (skipped above
/// `explicit_place_limit` places, since beyond that the bitmask encoding itself becomes
/// unsafe to build), symbolic reachability, deadlock finding, and — if `weights` is
/// supplied — the branch-and-cut optimizer.
pub fn analyze(
    net: &Net,
    weights: Option<&Weights>,
    config: &AnalysisConfig,
    explicit_place_limit: usize,
) -> Result<AnalysisReport> {
    let order = VarOrder::new_interleaved(net.num_places());
    let mut manager = BddManager::new(order.num_vars(), config.bdd_node_cap);

    let relations = symbolic::build_transition_relations(net, &mut manager, &order)?;
    let initial = symbolic::marking_cube(&mut manager, &order, net.initial_marking())?;
    let symbolic_outcome =
        symbolic::compute_reachable_set(&mut manager, &order, &relations, &initial, config)?;

    let status = match symbolic_outcome.status {
        ReachabilityStatus::Completed => AnalysisStatus::Completed,
        ReachabilityStatus::Cancelled | ReachabilityStatus::IterationCapReached => {
            AnalysisStatus::Cancelled
        }
    };

    let explicit_count = if net.num_places() <= explicit_place_limit {
        let outcome = explicit::explore(net, Order::BreadthFirst, config);
        match outcome {
            explicit::ExplorationOutcome::Completed { reachable } => Some(reachable.len() as u64),
            explicit::ExplorationOutcome::Cancelled { .. } => None,
        }
    } else {
        None
    };

    let symbolic_count = manager.count_states(&symbolic_outcome.reachable, net.num_places() as u32);

    if let Some(explicit) = explicit_count {
        if explicit != symbolic_count {
            log::warn!(
                "explicit and symbolic reachable counts disagree: {explicit} vs {symbolic_count}"
            );
        }
    }

    let deadlocks = crate::deadlock::find_deadlocks(
        net,
        &manager,
        &order,
        &symbolic_outcome.reachable,
        config,
    );

    let optimizer_outcome = weights.map(|w| {
        optimizer::optimize(net, &mut manager, &order, &symbolic_outcome.reachable, w, config)
    });

    info!(
        "analysis complete: {} reachable states, {} deadlocks{}",
        symbolic_count,
        deadlocks.deadlocks.len(),
        if deadlocks.truncated { " (truncated)" } else { "" }
    );

    Ok(AnalysisReport {
        status,
        reachable_counts: ReachableCounts {
            explicit: explicit_count,
            symbolic: symbolic_count,
        },
        deadlocks,
        optimizer: optimizer_outcome,
    })
}
