//! Construction of the partitioned symbolic transition relation and the frontier-based
//! fixed-point image iteration that computes the symbolic reachable set.

use log::{debug, trace};

use crate::bdd::ordering::VarOrder;
use crate::bdd::{Bdd, BddManager};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::net::Net;

/// One transition's relation `R_t(x, x')`, plus the frame it left implicit (kept around
/// only for diagnostics — `relation` already has the frame conjoined in).
pub struct TransitionRelation {
    pub relation: Bdd,
}

/// Build `R_t` for every transition with at least one input or output place. Transitions
/// with neither are skipped entirely, since they can never change and never gate on a
/// marking — conjoining a tautology for them would be pure overhead.
///
/// `R_t` is the conjunction of three parts, matching the symbolic reachability design:
/// enabling (current-state side), update (next-state side for affected places), and
/// frame (next-state side for every unaffected place, as `x'_p <=> x_p`).
pub fn build_transition_relations(
    net: &Net,
    manager: &mut BddManager,
    order: &VarOrder,
) -> Result<Vec<TransitionRelation>> {
    let mut relations = Vec::new();
    for t in net.transitions() {
        if net.is_null_transition(t) {
            continue;
        }
        let input = net.input_of(t);
        let output = net.output_of(t);

        let mut relation = manager.mk_true();
        for p in net.places() {
            let consumed = input.get(p.0);
            let produced = output.get(p.0);
            let xp = order.current(p);
            let xpn = order.next(p);

            if consumed {
                let var = manager.mk_var(xp)?;
                relation = manager.and(&relation, &var)?;
            } else if produced {
                // Produced but not consumed: the no-overflow enabling condition requires
                // the place start empty.
                let not_var = manager.mk_not_var(xp)?;
                relation = manager.and(&relation, &not_var)?;
            }

            let next_term = if consumed || produced {
                // Consumed-and-produced (self-loop) or produced-only both leave the place
                // holding a token after firing; consumed-only empties it.
                if produced {
                    manager.mk_var(xpn)?
                } else {
                    manager.mk_not_var(xpn)?
                }
            } else {
                let xp_var = manager.mk_var(xp)?;
                let xpn_var = manager.mk_var(xpn)?;
                let not_xp = manager.mk_not_var(xp)?;
                let not_xpn = manager.mk_not_var(xpn)?;
                let both_true = manager.and(&xp_var, &xpn_var)?;
                let both_false = manager.and(&not_xp, &not_xpn)?;
                manager.or(&both_true, &both_false)?
            };
            relation = manager.and(&relation, &next_term)?;
        }
        relations.push(TransitionRelation { relation });
    }
    Ok(relations)
}

/// Build the BDD cube corresponding to a single marking, over the current-state
/// variables only.
pub fn marking_cube(
    manager: &mut BddManager,
    order: &VarOrder,
    marking: &crate::net::marking::Marking,
) -> Result<Bdd> {
    let mut cube = manager.mk_true();
    for i in 0..marking.len() {
        let p = crate::net::PlaceId(i);
        let var = order.current(p);
        let literal = if marking.get(i) {
            manager.mk_var(var)?
        } else {
            manager.mk_not_var(var)?
        };
        cube = manager.and(&cube, &literal)?;
    }
    Ok(cube)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityStatus {
    Completed,
    Cancelled,
    IterationCapReached,
}

pub struct ReachabilityOutcome {
    pub status: ReachabilityStatus,
    /// The reachable-set BDD over current-state variables, as computed so far. Equal to
    /// the true fixed point iff `status == Completed`.
    pub reachable: Bdd,
    pub iterations: usize,
}

/// Compute the symbolic reachable set: `R = lfp(F -> F | exists x. F(x) & R_t(x,x'))` via
/// frontier-based image iteration, as laid out in the symbolic reachability design:
/// frontier (not the whole accumulated set) drives each image step, the partitioned
/// relation is tested per-transition with early termination when the frontier doesn't
/// intersect `R_t`, and quantification is exactly the current-variable set followed by a
/// rename of the primed result back onto the unprimed variables.
pub fn compute_reachable_set(
    manager: &mut BddManager,
    order: &VarOrder,
    relations: &[TransitionRelation],
    initial: &Bdd,
    config: &AnalysisConfig,
) -> Result<ReachabilityOutcome> {
    let current_vars = order.all_current();
    let rename_next_to_current: Vec<(u32, u32)> = order
        .place_order()
        .iter()
        .map(|&p| (order.next(p), order.current(p)))
        .collect();

    let mut reachable = *initial;
    let mut frontier = *initial;
    let mut iterations = 0usize;

    loop {
        if config.is_cancelled() {
            return Ok(ReachabilityOutcome {
                status: ReachabilityStatus::Cancelled,
                reachable,
                iterations,
            });
        }
        if iterations >= config.reachability_iteration_cap {
            return Ok(ReachabilityOutcome {
                status: ReachabilityStatus::IterationCapReached,
                reachable,
                iterations,
            });
        }

        let mut image = manager.mk_false();
        for rel in relations {
            let intersected = manager.and(&frontier, &rel.relation)?;
            if manager.is_false(&intersected) {
                // Per-transition early termination: the frontier doesn't reach this
                // transition's enabling condition at all, so skip it this round.
                continue;
            }
            let quantified = manager.exists(&intersected, &current_vars)?;
            let renamed = manager.rename(&quantified, &rename_next_to_current)?;
            image = manager.or(&image, &renamed)?;
        }

        let not_reachable = manager.not(&reachable)?;
        let new_states = manager.and(&image, &not_reachable)?;
        iterations += 1;

        if manager.is_false(&new_states) {
            trace!("reachability fixed point reached after {iterations} iterations");
            return Ok(ReachabilityOutcome {
                status: ReachabilityStatus::Completed,
                reachable,
                iterations,
            });
        }

        reachable = manager.or(&reachable, &new_states)?;
        frontier = new_states;
        debug!("reachability iteration {iterations}: frontier grew");
    }
}
