//! The branch-and-cut optimizer: maximizes a linear objective over the symbolic
//! reachable set using BDD-derived feasibility/inference, an LP relaxation for pruning,
//! and mutex cuts tightening that relaxation.

pub mod lp;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace};

use crate::bdd::ordering::VarOrder;
use crate::bdd::{Bdd, BddManager};
use crate::config::AnalysisConfig;
use crate::net::marking::Marking;
use crate::net::{Net, PlaceId};
use lp::{FixedVar, LpProblem, LpSolution, LpStatus, MutexCut};

/// Per-place integer weights, in net place order. Missing entries (if the caller hands
/// in a shorter vector) default to 0, matching the weight-vector input contract.
#[derive(Debug, Clone)]
pub struct Weights(Vec<i64>);

impl Weights {
    pub fn new(weights: Vec<i64>) -> Self {
        Weights(weights)
    }

    fn get(&self, p: PlaceId) -> i64 {
        self.0.get(p.0).copied().unwrap_or(0)
    }
}

struct SearchNode {
    fixed_zero: Vec<PlaceId>,
    fixed_one: Vec<PlaceId>,
    ub: f64,
    creation_index: u64,
    restricted: Bdd,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.ub == other.ub && self.creation_index == other.creation_index
    }
}
impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first by descending upper bound; stable tie-break by (reversed) creation index so
/// traces stay reproducible across runs with identical input, matching the branch-and-cut
/// priority queue design.
impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ub
            .partial_cmp(&other.ub)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.creation_index.cmp(&self.creation_index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerStatus {
    /// The queue emptied with every pruned node having ub <= incumbent: the incumbent
    /// (if any) is certified optimal.
    Optimal,
    /// No reachable marking exists at all (`R` is false): there is no feasible solution.
    Infeasible,
    Cancelled,
    NodeCapReached,
}

#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    pub status: OptimizerStatus,
    pub incumbent: Option<(Marking, i64)>,
    pub nodes_explored: usize,
}

/// Run the branch-and-cut search described in the optimizer design: best-first over a
/// priority queue of partial assignments, each node pruned by BDD feasibility, an
/// inference pass that forces free variables the BDD already determines, an LP
/// relaxation upper bound tightened by a bounded set of mutex cuts, and branching on the
/// free variable with the largest `|c_p|` when nothing else closes the node.
pub fn optimize(
    net: &Net,
    manager: &mut BddManager,
    order: &VarOrder,
    reachable: &Bdd,
    weights: &Weights,
    config: &AnalysisConfig,
) -> OptimizerOutcome {
    if manager.is_false(reachable) {
        return OptimizerOutcome {
            status: OptimizerStatus::Infeasible,
            incumbent: None,
            nodes_explored: 0,
        };
    }

    let mut incumbent: Option<(Marking, i64)> = None;
    let mut next_creation_index = 0u64;
    let mut nodes_explored = 0usize;

    let root_ub = box_upper_bound(net, weights, &[], &[]);
    let mut queue = BinaryHeap::new();
    queue.push(SearchNode {
        fixed_zero: Vec::new(),
        fixed_one: Vec::new(),
        ub: root_ub,
        creation_index: next_creation_index,
        restricted: *reachable,
    });
    next_creation_index += 1;

    while let Some(node) = queue.pop() {
        if config.is_cancelled() {
            return OptimizerOutcome {
                status: OptimizerStatus::Cancelled,
                incumbent,
                nodes_explored,
            };
        }
        if nodes_explored >= config.optimizer_node_cap {
            return OptimizerOutcome {
                status: OptimizerStatus::NodeCapReached,
                incumbent,
                nodes_explored,
            };
        }
        nodes_explored += 1;

        let incumbent_value = incumbent.as_ref().map(|(_, v)| *v).unwrap_or(i64::MIN);
        if node.ub <= incumbent_value as f64 {
            trace!("pruning node with ub {} <= incumbent {}", node.ub, incumbent_value);
            continue;
        }

        // Feasibility: the node's `restricted` BDD already has the fixed assignments
        // cofactored in (it's built that way at creation time below), so `false` means
        // prune outright.
        if manager.is_false(&node.restricted) {
            continue;
        }

        let free_places: Vec<PlaceId> = net
            .places()
            .filter(|p| !node.fixed_zero.contains(p) && !node.fixed_one.contains(p))
            .collect();

        // Singleton shortcut.
        let free_vars: Vec<u32> = free_places.iter().map(|&p| order.current(p)).collect();
        let count = manager.sat_count(&node.restricted, free_vars.len() as u32);
        if count == 1.0 {
            let cubes = manager.enumerate_cubes(&node.restricted, &free_vars);
            if let Some(assignment) = cubes.into_iter().next() {
                let marking = close_node(net, &node, &free_places, &assignment);
                let value = objective(&marking, weights);
                update_incumbent(&mut incumbent, marking, value);
            }
            continue;
        }

        // Inference (separation): for each free place, test whether fixing it one way
        // falsifies the restricted set, forcing the opposite value.
        let mut forced_zero = node.fixed_zero.clone();
        let mut forced_one = node.fixed_one.clone();
        let mut still_free = Vec::new();
        for &p in &free_places {
            let var = order.current(p);
            let with_one = manager.restrict(&node.restricted, &[(var, true)]);
            let with_zero = manager.restrict(&node.restricted, &[(var, false)]);
            match (with_one, with_zero) {
                // Both restrictions false is impossible here: `node.restricted` is
                // already known non-false (checked above), and by Shannon expansion it
                // equals the disjunction of its two cofactors on `var`, so at least one
                // must be non-false.
                (Ok(one), Ok(zero)) if manager.is_false(&one) => {
                    debug_assert!(!manager.is_false(&zero));
                    forced_zero.push(p);
                }
                (Ok(one), Ok(zero)) if manager.is_false(&zero) => {
                    let _ = one;
                    forced_one.push(p);
                }
                _ => still_free.push(p),
            }
        }

        let restricted_after_inference = match restrict_to(manager, reachable, &forced_zero, &forced_one, order)
        {
            Ok(bdd) => bdd,
            Err(_) => continue,
        };
        if manager.is_false(&restricted_after_inference) {
            continue;
        }

        // LP relaxation.
        let cuts = generate_mutex_cuts(manager, &restricted_after_inference, &still_free, order, config);
        let lp_solution = solve_lp(net, weights, &forced_zero, &forced_one, &cuts, config);
        if lp_solution.status != LpStatus::Optimal {
            continue;
        }
        let effective_ub = node.ub.min(lp_solution.objective);
        if effective_ub <= incumbent_value as f64 {
            continue;
        }

        // Integrality check: if the LP optimum happens to already be 0/1 everywhere,
        // verify it against the BDD directly.
        if let Some(marking) = integral_solution(net, &lp_solution, &forced_zero, &forced_one) {
            if verify_against_bdd(manager, &restricted_after_inference, &marking, order) {
                let value = objective(&marking, weights);
                update_incumbent(&mut incumbent, marking, value);
                continue;
            }
        }

        if still_free.is_empty() {
            // No free variable left to branch on, and we didn't close above: this node
            // contributes nothing further.
            continue;
        }

        // Branching: pick the free variable with the largest |c_p|.
        let branch_place = *still_free
            .iter()
            .max_by(|a, b| weights.get(**a).abs().cmp(&weights.get(**b).abs()))
            .expect("still_free is non-empty");

        for &value in &[true, false] {
            let mut child_zero = forced_zero.clone();
            let mut child_one = forced_one.clone();
            if value {
                child_one.push(branch_place);
            } else {
                child_zero.push(branch_place);
            }
            let child_restricted =
                match restrict_to(manager, reachable, &child_zero, &child_one, order) {
                    Ok(bdd) => bdd,
                    Err(_) => continue,
                };
            if manager.is_false(&child_restricted) {
                continue;
            }
            let child_ub = node.ub.min(box_upper_bound(net, weights, &child_zero, &child_one))
                .min(lp_solution.objective);
            queue.push(SearchNode {
                fixed_zero: child_zero,
                fixed_one: child_one,
                ub: child_ub,
                creation_index: next_creation_index,
                restricted: child_restricted,
            });
            next_creation_index += 1;
        }
    }

    debug!("optimizer explored {nodes_explored} nodes");
    OptimizerOutcome {
        status: OptimizerStatus::Optimal,
        incumbent,
        nodes_explored,
    }
}

fn restrict_to(
    manager: &mut BddManager,
    reachable: &Bdd,
    fixed_zero: &[PlaceId],
    fixed_one: &[PlaceId],
    order: &VarOrder,
) -> crate::error::Result<Bdd> {
    let mut assignment = Vec::with_capacity(fixed_zero.len() + fixed_one.len());
    for &p in fixed_zero {
        assignment.push((order.current(p), false));
    }
    for &p in fixed_one {
        assignment.push((order.current(p), true));
    }
    manager.restrict(reachable, &assignment)
}

fn close_node(
    net: &Net,
    node: &SearchNode,
    free_places: &[PlaceId],
    assignment: &[bool],
) -> Marking {
    let mut tokens = vec![false; net.num_places()];
    for &p in &node.fixed_one {
        tokens[p.0] = true;
    }
    for (i, &p) in free_places.iter().enumerate() {
        tokens[p.0] = assignment[i];
    }
    Marking::new(tokens)
}

fn integral_solution(
    net: &Net,
    lp: &LpSolution,
    fixed_zero: &[PlaceId],
    fixed_one: &[PlaceId],
) -> Option<Marking> {
    let mut tokens = Vec::with_capacity(net.num_places());
    for (i, &v) in lp.values.iter().enumerate() {
        let is_fixed_zero = fixed_zero.iter().any(|p| p.0 == i);
        let is_fixed_one = fixed_one.iter().any(|p| p.0 == i);
        let bit = if is_fixed_zero {
            false
        } else if is_fixed_one {
            true
        } else if (v - 0.0).abs() < 1e-9 {
            false
        } else if (v - 1.0).abs() < 1e-9 {
            true
        } else {
            return None;
        };
        tokens.push(bit);
    }
    Some(Marking::new(tokens))
}

fn verify_against_bdd(
    manager: &mut BddManager,
    restricted: &Bdd,
    marking: &Marking,
    order: &VarOrder,
) -> bool {
    let assignment: Vec<(u32, bool)> = (0..marking.len())
        .map(|i| (order.current(PlaceId(i)), marking.get(i)))
        .collect();
    match manager.restrict(restricted, &assignment) {
        Ok(result) => manager.is_true(&result),
        Err(_) => false,
    }
}

fn objective(marking: &Marking, weights: &Weights) -> i64 {
    (0..marking.len())
        .filter(|&i| marking.get(i))
        .map(|i| weights.get(PlaceId(i)))
        .sum()
}

fn update_incumbent(incumbent: &mut Option<(Marking, i64)>, marking: Marking, value: i64) {
    let better = match incumbent {
        Some((_, current)) => value > *current,
        None => true,
    };
    if better {
        *incumbent = Some((marking, value));
    }
}

/// Upper bound from the box relaxation alone, ignoring `R` entirely: each fixed variable
/// contributes its forced value, each free variable contributes `max(c_p, 0)`. Used as
/// the root bound and as one term combined with the LP's own bound for child nodes.
fn box_upper_bound(net: &Net, weights: &Weights, fixed_zero: &[PlaceId], fixed_one: &[PlaceId]) -> f64 {
    let mut bound = 0i64;
    for p in net.places() {
        let c = weights.get(p);
        if fixed_one.contains(&p) {
            bound += c;
        } else if fixed_zero.contains(&p) {
            // contributes 0
        } else {
            bound += c.max(0);
        }
    }
    bound as f64
}

fn solve_lp(
    net: &Net,
    weights: &Weights,
    fixed_zero: &[PlaceId],
    fixed_one: &[PlaceId],
    cuts: &[MutexCut],
    config: &AnalysisConfig,
) -> LpSolution {
    let mut fixed = Vec::with_capacity(fixed_zero.len() + fixed_one.len());
    for &p in fixed_zero {
        fixed.push(FixedVar { place: p, value: false });
    }
    for &p in fixed_one {
        fixed.push(FixedVar { place: p, value: true });
    }
    let objective: Vec<f64> = net.places().map(|p| weights.get(p) as f64).collect();
    let problem = LpProblem {
        num_vars: net.num_places(),
        objective,
        fixed,
        cuts: cuts.to_vec(),
    };
    config.lp_solver.solve(&problem)
}

/// Generate up to `config.mutex_cut_budget` mutex cuts among `free_places`: for each
/// candidate pair `(u, v)`, test whether `restricted & x_u=1 & x_v=1` is false, and if so
/// emit the inequality. The budget is a hard per-node cap, matching the design note that
/// it must be finite per node.
fn generate_mutex_cuts(
    manager: &mut BddManager,
    restricted: &Bdd,
    free_places: &[PlaceId],
    order: &VarOrder,
    config: &AnalysisConfig,
) -> Vec<MutexCut> {
    let mut cuts = Vec::new();
    let mut budget = config.mutex_cut_budget;
    'outer: for i in 0..free_places.len() {
        for j in (i + 1)..free_places.len() {
            if budget == 0 {
                break 'outer;
            }
            budget -= 1;
            let u = free_places[i];
            let v = free_places[j];
            let assignment = [(order.current(u), true), (order.current(v), true)];
            if let Ok(both_one) = manager.restrict(restricted, &assignment) {
                if manager.is_false(&both_one) {
                    cuts.push(MutexCut { u, v });
                }
            }
        }
    }
    cuts
}
