//! The LP solver contract (§6 of the external interfaces) and one bundled, deliberately
//! simple implementation.
//!
//! Choice of LP backend is an external-collaborator concern; any solver honoring
//! [`LpSolver`] plugs into the optimizer. [`BoxBoundLpSolver`] below is the crate's own
//! stand-in: it ignores the supplied cuts and bounds the objective by the box relaxation
//! alone. That is always a valid (if loose) upper bound, since dropping constraints can
//! only enlarge the feasible region, and it keeps the bundled dependency-free default
//! honest about what it does and doesn't account for — callers who need the cuts to
//! tighten the bound should supply a real simplex/interior-point backend instead.

use crate::net::PlaceId;

/// One variable fixed to a constant by branching.
#[derive(Debug, Clone, Copy)]
pub struct FixedVar {
    pub place: PlaceId,
    pub value: bool,
}

/// A mutex cut: `x_u + x_v <= 1`.
#[derive(Debug, Clone, Copy)]
pub struct MutexCut {
    pub u: PlaceId,
    pub v: PlaceId,
}

/// One LP relaxation instance, as handed to the solver by the optimizer.
#[derive(Debug, Clone)]
pub struct LpProblem {
    pub num_vars: usize,
    pub objective: Vec<f64>,
    pub fixed: Vec<FixedVar>,
    pub cuts: Vec<MutexCut>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    /// Anything the solver can't classify as one of the above. The optimizer treats this
    /// exactly like infeasible: prune the node and move on.
    Other,
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: LpStatus,
    pub objective: f64,
    /// Fractional assignment in `[0, 1]` per place, in net place order. Empty unless
    /// `status == Optimal`.
    pub values: Vec<f64>,
}

/// The optimizer's one dependency on the outside world: solve the continuous relaxation
/// of the branch-and-cut subproblem and report back status, objective, and solution.
/// Implementations must tolerate `Other` as "prune this node" rather than propagating an
/// error — per the error handling design, solver failures never abort the search.
pub trait LpSolver: Send + Sync {
    fn solve(&self, problem: &LpProblem) -> LpSolution;
}

/// Bounds the objective using only the box constraints `x_p in [0,1]` (or fixed to the
/// branching value) and ignores the accumulated mutex cuts entirely.
///
/// The bound it returns is `sum_p fixed_or_box_bound(c_p)`, where a free variable
/// contributes `max(c_p, 0)` (it can be pushed to 1 if that helps, to 0 otherwise) and a
/// fixed variable contributes `c_p * value`. This is sound as an upper bound for any
/// feasible region contained in the box, cuts or no cuts, but it will not separate nodes
/// the way a real simplex solver handling the cuts would; it exists so the optimizer is
/// exercisable without a third-party LP dependency, not as a performance claim.
pub struct BoxBoundLpSolver;

impl LpSolver for BoxBoundLpSolver {
    fn solve(&self, problem: &LpProblem) -> LpSolution {
        let mut fixed_value = vec![None; problem.num_vars];
        for f in &problem.fixed {
            fixed_value[f.place.0] = Some(f.value);
        }

        let mut objective = 0.0;
        let mut values = vec![0.0; problem.num_vars];
        for p in 0..problem.num_vars {
            let c = problem.objective.get(p).copied().unwrap_or(0.0);
            match fixed_value[p] {
                Some(true) => {
                    values[p] = 1.0;
                    objective += c;
                }
                Some(false) => {
                    values[p] = 0.0;
                }
                None => {
                    if c > 0.0 {
                        values[p] = 1.0;
                        objective += c;
                    } else {
                        values[p] = 0.0;
                    }
                }
            }
        }

        LpSolution {
            status: LpStatus::Optimal,
            objective,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_bound_maximizes_positive_weights() {
        let solver = BoxBoundLpSolver;
        let problem = LpProblem {
            num_vars: 3,
            objective: vec![3.0, -1.0, 5.0],
            fixed: vec![],
            cuts: vec![],
        };
        let solution = solver.solve(&problem);
        assert_eq!(solution.status, LpStatus::Optimal);
        assert_eq!(solution.objective, 8.0);
        assert_eq!(solution.values, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn box_bound_respects_fixed_vars() {
        let solver = BoxBoundLpSolver;
        let problem = LpProblem {
            num_vars: 2,
            objective: vec![10.0, 10.0],
            fixed: vec![FixedVar { place: PlaceId(0), value: false }],
            cuts: vec![],
        };
        let solution = solver.solve(&problem);
        assert_eq!(solution.objective, 10.0);
        assert_eq!(solution.values[0], 0.0);
    }
}
