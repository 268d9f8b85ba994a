//! End-to-end coverage of the seed scenarios: small, hand-built nets whose reachable
//! sets, deadlocks, and optimizer outcomes are known by construction.

use std::collections::BTreeMap;

use pn1s::config::AnalysisConfig;
use pn1s::net::{RawArc, RawNetInput, RawPlace, RawTransition};
use pn1s::optimizer::{OptimizerStatus, Weights};
use pn1s::report::AnalysisStatus;
use pn1s::{analyze, Net};

fn place(id: &str) -> RawPlace {
    RawPlace { id: id.to_string(), name: None }
}

fn transition(id: &str) -> RawTransition {
    RawTransition { id: id.to_string(), name: None }
}

fn arc(place: &str, transition: &str) -> RawArc {
    RawArc {
        place: place.to_string(),
        transition: transition.to_string(),
        multiplicity: 1,
    }
}

#[test]
fn two_place_alternator() {
    let raw = RawNetInput {
        places: vec![place("p1"), place("p2")],
        transitions: vec![transition("t1"), transition("t2")],
        input_arcs: vec![arc("p1", "t1"), arc("p2", "t2")],
        output_arcs: vec![arc("p2", "t1"), arc("p1", "t2")],
        initial_marking: BTreeMap::from([("p1".to_string(), 1)]),
    };
    let net = Net::from_raw(raw).unwrap();
    let config = AnalysisConfig::default();
    let weights = Weights::new(vec![3, 5]);
    let report = analyze(&net, Some(&weights), &config, 128).unwrap();

    assert_eq!(report.status, AnalysisStatus::Completed);
    assert_eq!(report.reachable_counts.symbolic, 2);
    assert_eq!(report.reachable_counts.explicit, Some(2));
    assert!(report.deadlocks.deadlocks.is_empty());

    let outcome = report.optimizer.unwrap();
    assert_eq!(outcome.status, OptimizerStatus::Optimal);
    let (marking, value) = outcome.incumbent.unwrap();
    assert_eq!(value, 5);
    assert!(!marking.get(0));
    assert!(marking.get(1));
}

#[test]
fn producer_consumer_bounded_buffer() {
    let raw = RawNetInput {
        places: vec![place("ready"), place("busy"), place("buf"), place("done")],
        transitions: vec![
            transition("start"),
            transition("fill"),
            transition("take"),
            transition("reset"),
        ],
        input_arcs: vec![
            arc("ready", "start"),
            arc("busy", "fill"),
            arc("buf", "take"),
            arc("done", "reset"),
        ],
        output_arcs: vec![
            arc("busy", "start"),
            arc("buf", "fill"),
            arc("done", "take"),
            arc("ready", "reset"),
        ],
        initial_marking: BTreeMap::from([("ready".to_string(), 1)]),
    };
    let net = Net::from_raw(raw).unwrap();
    let config = AnalysisConfig::default();
    let weights = Weights::new(vec![0, 0, 0, 1]);
    let report = analyze(&net, Some(&weights), &config, 128).unwrap();

    assert_eq!(report.reachable_counts.symbolic, 4);
    assert!(report.deadlocks.deadlocks.is_empty());

    let outcome = report.optimizer.unwrap();
    let (marking, value) = outcome.incumbent.unwrap();
    assert_eq!(value, 1);
    assert!(marking.get(3));
    assert!(!marking.get(0) && !marking.get(1) && !marking.get(2));
}

#[test]
fn deadlocking_fork() {
    let raw = RawNetInput {
        places: vec![place("a"), place("b"), place("c")],
        transitions: vec![transition("t1"), transition("t2")],
        input_arcs: vec![arc("a", "t1"), arc("a", "t2")],
        output_arcs: vec![arc("b", "t1"), arc("c", "t2")],
        initial_marking: BTreeMap::from([("a".to_string(), 1)]),
    };
    let net = Net::from_raw(raw).unwrap();
    let config = AnalysisConfig::default();
    let report = analyze(&net, None, &config, 128).unwrap();

    assert_eq!(report.reachable_counts.symbolic, 3);
    assert_eq!(report.deadlocks.deadlocks.len(), 2);
    for marking in &report.deadlocks.deadlocks {
        assert!(!marking.get(0));
        assert!(marking.get(1) != marking.get(2));
    }
}

/// Four dining philosophers, standard think/wait-left/wait-right/eat/fork encoding.
/// Philosopher i needs fork i and fork (i+1 mod 4); the classical deadlock is every
/// philosopher holding exactly one fork (all waiting on the other).
fn dining_philosophers(n: usize) -> Net {
    let mut places = Vec::new();
    let mut transitions = Vec::new();
    let mut input_arcs = Vec::new();
    let mut output_arcs = Vec::new();
    let mut initial_marking = BTreeMap::new();

    for i in 0..n {
        places.push(place(&format!("think{i}")));
        places.push(place(&format!("wait_left{i}")));
        places.push(place(&format!("wait_right{i}")));
        places.push(place(&format!("eat{i}")));
    }
    for i in 0..n {
        places.push(place(&format!("fork{i}")));
        initial_marking.insert(format!("fork{i}"), 1);
        initial_marking.insert(format!("think{i}"), 1);
    }

    for i in 0..n {
        let right_fork = i;
        let left_fork = (i + 1) % n;

        // Each philosopher may pick up either fork first, landing in the
        // corresponding wait state, then must acquire the other fork to eat.
        let take_left_first = format!("take_left_first{i}");
        transitions.push(transition(&take_left_first));
        input_arcs.push(arc(&format!("think{i}"), &take_left_first));
        input_arcs.push(arc(&format!("fork{left_fork}"), &take_left_first));
        output_arcs.push(arc(&format!("wait_left{i}"), &take_left_first));

        let take_right_first = format!("take_right_first{i}");
        transitions.push(transition(&take_right_first));
        input_arcs.push(arc(&format!("think{i}"), &take_right_first));
        input_arcs.push(arc(&format!("fork{right_fork}"), &take_right_first));
        output_arcs.push(arc(&format!("wait_right{i}"), &take_right_first));

        let complete_from_left = format!("complete_from_left{i}");
        transitions.push(transition(&complete_from_left));
        input_arcs.push(arc(&format!("wait_left{i}"), &complete_from_left));
        input_arcs.push(arc(&format!("fork{right_fork}"), &complete_from_left));
        output_arcs.push(arc(&format!("eat{i}"), &complete_from_left));

        let complete_from_right = format!("complete_from_right{i}");
        transitions.push(transition(&complete_from_right));
        input_arcs.push(arc(&format!("wait_right{i}"), &complete_from_right));
        input_arcs.push(arc(&format!("fork{left_fork}"), &complete_from_right));
        output_arcs.push(arc(&format!("eat{i}"), &complete_from_right));

        let put_down = format!("put_down{i}");
        transitions.push(transition(&put_down));
        input_arcs.push(arc(&format!("eat{i}"), &put_down));
        output_arcs.push(arc(&format!("think{i}"), &put_down));
        output_arcs.push(arc(&format!("fork{left_fork}"), &put_down));
        output_arcs.push(arc(&format!("fork{right_fork}"), &put_down));
    }

    let raw = RawNetInput {
        places,
        transitions,
        input_arcs,
        output_arcs,
        initial_marking,
    };
    Net::from_raw(raw).unwrap()
}

#[test]
fn four_dining_philosophers_contains_classical_deadlock() {
    let net = dining_philosophers(4);
    let config = AnalysisConfig::default();
    let report = analyze(&net, None, &config, 0).unwrap();

    assert!(!report.deadlocks.truncated);
    assert!(
        !report.deadlocks.deadlocks.is_empty(),
        "the symmetric fork deadlock must be reachable"
    );

    let place_id = |name: &str| net.place_by_id(name).unwrap();
    let any_all_waiting_left = report.deadlocks.deadlocks.iter().any(|marking| {
        (0..4).all(|i| marking.get(place_id(&format!("wait_left{i}")).0))
    });
    assert!(any_all_waiting_left, "expected the all-hold-one-fork deadlock");
}

#[test]
fn four_dining_philosophers_cannot_have_all_four_eating() {
    let net = dining_philosophers(4);
    let config = AnalysisConfig::default();
    let mut weights = vec![0i64; net.num_places()];
    for i in 0..4 {
        weights[net.place_by_id(&format!("eat{i}")).unwrap().0] = 10;
        weights[net.place_by_id(&format!("wait_left{i}")).unwrap().0] = -1;
        weights[net.place_by_id(&format!("wait_right{i}")).unwrap().0] = -1;
    }
    let report = analyze(&net, Some(&Weights::new(weights)), &config, 0).unwrap();
    let (marking, _) = report.optimizer.unwrap().incumbent.unwrap();
    let eating_count = (0..4)
        .filter(|&i| marking.get(net.place_by_id(&format!("eat{i}")).unwrap().0))
        .count();
    assert!(eating_count < 4, "the symmetric four-fork net never lets all four eat");
}

#[test]
fn unreachable_optimum() {
    // p2 has no incoming arc from anywhere in the net, so it can never hold a token: the
    // only transition moves the token from p0 to p1 and stops there. The optimizer must
    // not credit an objective to a place no reachable marking ever sets.
    let raw = RawNetInput {
        places: vec![place("p0"), place("p1"), place("p2")],
        transitions: vec![transition("t01")],
        input_arcs: vec![arc("p0", "t01")],
        output_arcs: vec![arc("p1", "t01")],
        initial_marking: BTreeMap::from([("p0".to_string(), 1)]),
    };
    let net = Net::from_raw(raw).unwrap();
    let config = AnalysisConfig::default();
    let weights = Weights::new(vec![0, 0, 10]);
    let report = analyze(&net, Some(&weights), &config, 128).unwrap();
    assert_eq!(report.reachable_counts.symbolic, 2);
    let (marking, value) = report.optimizer.unwrap().incumbent.unwrap();
    assert_eq!(value, 0);
    assert!(!marking.get(2));
}

#[test]
fn net_with_no_transitions_has_singleton_reachable_set() {
    let raw = RawNetInput {
        places: vec![place("only")],
        transitions: vec![],
        input_arcs: vec![],
        output_arcs: vec![],
        initial_marking: BTreeMap::from([("only".to_string(), 1)]),
    };
    let net = Net::from_raw(raw).unwrap();
    let config = AnalysisConfig::default();
    let weights = Weights::new(vec![7]);
    let report = analyze(&net, Some(&weights), &config, 128).unwrap();

    assert_eq!(report.reachable_counts.symbolic, 1);
    assert_eq!(report.deadlocks.deadlocks.len(), 1);
    let (marking, value) = report.optimizer.unwrap().incumbent.unwrap();
    assert!(marking.get(0));
    assert_eq!(value, 7);
}
