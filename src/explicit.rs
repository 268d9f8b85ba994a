//! The bitmask-based explicit explorer: an oracle for tests and a fallback for nets small
//! enough that materializing every reachable marking as an integer is cheap. Breadth-first
//! and depth-first traversal share one stepping procedure — only the fringe's pop order
//! differs.

use ahash::AHashSet;
use log::debug;

use crate::config::AnalysisConfig;
use crate::net::marking::Bitmask;
use crate::net::Net;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    BreadthFirst,
    DepthFirst,
}

/// Outcome of a full explicit exploration.
#[derive(Debug, Clone)]
pub enum ExplorationOutcome {
    Completed { reachable: Vec<Bitmask> },
    Cancelled { reachable_so_far: Vec<Bitmask> },
}

impl ExplorationOutcome {
    pub fn reachable(&self) -> &[Bitmask] {
        match self {
            ExplorationOutcome::Completed { reachable } => reachable,
            ExplorationOutcome::Cancelled { reachable_so_far } => reachable_so_far,
        }
    }
}

/// Explore every marking reachable from `net`'s initial marking, in the given traversal
/// order. Both orders visit the same set of markings; they differ only in which
/// unexplored marking is expanded next, which is irrelevant to the final reachable set
/// but affects memory profile (DFS keeps a smaller fringe on deep, narrow nets).
pub fn explore(net: &Net, order: Order, config: &AnalysisConfig) -> ExplorationOutcome {
    let m0 = net.initial_marking().to_bitmask();
    let mut visited: AHashSet<u128> = AHashSet::new();
    visited.insert(m0.raw());
    let mut fringe: Vec<Bitmask> = vec![m0];
    let mut reachable: Vec<Bitmask> = vec![m0];

    while let Some(current) = pop_next(&mut fringe, order) {
        if config.is_cancelled() {
            debug!("explicit explorer cancelled with {} markings found", reachable.len());
            return ExplorationOutcome::Cancelled {
                reachable_so_far: reachable,
            };
        }
        for t in net.transitions() {
            if let Some(next) = net.try_fire(t, &current) {
                if visited.insert(next.raw()) {
                    reachable.push(next);
                    fringe.push(next);
                }
            }
        }
    }

    ExplorationOutcome::Completed { reachable }
}

fn pop_next(fringe: &mut Vec<Bitmask>, order: Order) -> Option<Bitmask> {
    match order {
        Order::DepthFirst => fringe.pop(),
        Order::BreadthFirst => {
            if fringe.is_empty() {
                None
            } else {
                Some(fringe.remove(0))
            }
        }
    }
}

/// Is `m` a deadlock marking: no transition in `net` is fireable at it?
pub fn is_deadlock(net: &Net, m: &Bitmask) -> bool {
    net.transitions().all(|t| !net.is_fireable(t, m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{RawArc, RawNetInput, RawPlace, RawTransition};
    use std::collections::BTreeMap;

    fn alternator() -> Net {
        let raw = RawNetInput {
            places: vec![
                RawPlace { id: "p1".into(), name: None },
                RawPlace { id: "p2".into(), name: None },
            ],
            transitions: vec![
                RawTransition { id: "t1".into(), name: None },
                RawTransition { id: "t2".into(), name: None },
            ],
            input_arcs: vec![
                RawArc { place: "p1".into(), transition: "t1".into(), multiplicity: 1 },
                RawArc { place: "p2".into(), transition: "t2".into(), multiplicity: 1 },
            ],
            output_arcs: vec![
                RawArc { place: "p2".into(), transition: "t1".into(), multiplicity: 1 },
                RawArc { place: "p1".into(), transition: "t2".into(), multiplicity: 1 },
            ],
            initial_marking: BTreeMap::from([("p1".to_string(), 1)]),
        };
        Net::from_raw(raw).unwrap()
    }

    fn fork() -> Net {
        let raw = RawNetInput {
            places: vec![
                RawPlace { id: "a".into(), name: None },
                RawPlace { id: "b".into(), name: None },
                RawPlace { id: "c".into(), name: None },
            ],
            transitions: vec![
                RawTransition { id: "t1".into(), name: None },
                RawTransition { id: "t2".into(), name: None },
            ],
            input_arcs: vec![
                RawArc { place: "a".into(), transition: "t1".into(), multiplicity: 1 },
                RawArc { place: "a".into(), transition: "t2".into(), multiplicity: 1 },
            ],
            output_arcs: vec![
                RawArc { place: "b".into(), transition: "t1".into(), multiplicity: 1 },
                RawArc { place: "c".into(), transition: "t2".into(), multiplicity: 1 },
            ],
            initial_marking: BTreeMap::from([("a".to_string(), 1)]),
        };
        Net::from_raw(raw).unwrap()
    }

    #[test]
    fn bfs_and_dfs_agree_on_reachable_set() {
        let net = alternator();
        let config = AnalysisConfig::default();
        let bfs = explore(&net, Order::BreadthFirst, &config);
        let dfs = explore(&net, Order::DepthFirst, &config);
        let mut bfs_set: Vec<u128> = bfs.reachable().iter().map(|m| m.raw()).collect();
        let mut dfs_set: Vec<u128> = dfs.reachable().iter().map(|m| m.raw()).collect();
        bfs_set.sort_unstable();
        dfs_set.sort_unstable();
        assert_eq!(bfs_set, dfs_set);
        assert_eq!(bfs_set, vec![0b01, 0b10]);
    }

    #[test]
    fn deadlocking_fork_finds_two_deadlocks() {
        let net = fork();
        let config = AnalysisConfig::default();
        let outcome = explore(&net, Order::BreadthFirst, &config);
        let deadlocks: Vec<_> = outcome
            .reachable()
            .iter()
            .filter(|m| is_deadlock(&net, m))
            .collect();
        assert_eq!(deadlocks.len(), 2);
    }
}
