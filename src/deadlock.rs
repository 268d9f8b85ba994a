//! The deadlock finder: enumerates satisfying cubes of the symbolic reachable set and
//! filters them by the "no transition fireable" predicate, evaluated directly against
//! the net rather than symbolically.
//!
//! Building a symbolic "no transition enabled" BDD is possible and arguably cleaner, but
//! for the 1-safe regime and the net sizes this engine targets, explicit filtering of
//! enumerated cubes is simpler and sufficient — see the design notes this choice is
//! grounded on.

use log::warn;

use crate::bdd::ordering::VarOrder;
use crate::bdd::{Bdd, BddManager};
use crate::config::AnalysisConfig;
use crate::explicit::is_deadlock;
use crate::net::marking::Marking;
use crate::net::Net;

#[derive(Debug, Clone)]
pub struct DeadlockReport {
    pub deadlocks: Vec<Marking>,
    /// `true` iff the enumeration cap was hit before every cube was fully expanded —
    /// this can cause false negatives (a real deadlock may have been left unexamined),
    /// so callers must not treat an empty report as proof of deadlock-freedom when this
    /// flag is set.
    pub truncated: bool,
}

/// Find every deadlock marking in `reachable`, a BDD over current-state place variables.
pub fn find_deadlocks(
    net: &Net,
    manager: &BddManager,
    order: &VarOrder,
    reachable: &Bdd,
    config: &AnalysisConfig,
) -> DeadlockReport {
    let care_vars = order.all_current();
    let num_places = net.num_places();

    let mut deadlocks = Vec::new();
    let mut truncated = false;
    let mut examined = 0usize;

    // `enumerate_cubes` already expands every don't-care combination into a concrete
    // assignment, so each entry here is a complete marking in variable order, not a
    // partial cube. We still apply the cap against the number of completions examined,
    // matching the specification's "capacity cap on the enumeration" rule.
    let completions = manager.enumerate_cubes(reachable, &care_vars);
    for completion in completions {
        if config.is_cancelled() {
            truncated = true;
            break;
        }
        if examined >= config.deadlock_enum_cap {
            truncated = true;
            warn!(
                "deadlock enumeration truncated after {} completions",
                config.deadlock_enum_cap
            );
            break;
        }
        examined += 1;

        let marking = assignment_to_marking(order, &completion, num_places);
        let bitmask = marking.to_bitmask();
        if is_deadlock(net, &bitmask) {
            deadlocks.push(marking);
        }
    }

    DeadlockReport { deadlocks, truncated }
}

/// `care_vars` was built from `order.all_current()`, i.e. in ascending BDD-variable-id
/// order; translate each position back to its place before filling in the dense marking.
fn assignment_to_marking(order: &VarOrder, assignment: &[bool], num_places: usize) -> Marking {
    let mut tokens = vec![false; num_places];
    for (position, &place) in order.place_order().iter().enumerate() {
        tokens[place.0] = assignment[position];
    }
    Marking::new(tokens)
}
