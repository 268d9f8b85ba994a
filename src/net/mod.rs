//! The immutable net model: places, transitions, the input/output incidence matrices, and
//! the initial marking. Constructed once by a parser and never mutated afterward — see
//! the module-level note on ownership in the crate root.

pub mod marking;

use std::collections::BTreeMap;

use ahash::AHashMap;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use marking::{Bitmask, Marking};

/// Index of a place within a [`Net`]'s place order. Newtype over `usize` so place and
/// transition indices can't be swapped at a call site by accident.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaceId(pub usize);

/// Index of a transition within a [`Net`]'s transition order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId(pub usize);

/// One arc, as supplied by the parser: a place/transition pair with a multiplicity.
/// 1-safe nets never need a multiplicity above 1, but the parser contract allows callers
/// to hand one in anyway; any value greater than 1 is clamped the same way an
/// over-marked place is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArc {
    pub place: String,
    pub transition: String,
    pub multiplicity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlace {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransition {
    pub id: String,
    pub name: Option<String>,
}

/// The parser contract described in the specification's external-interfaces section: a
/// net as handed over by whatever reads a net description off disk, before the core has
/// validated or densified it.
///
/// Arcs whose endpoints don't name a declared place or transition are silently dropped —
/// that lenience belongs to the parser boundary, not the core's `Net::new`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNetInput {
    pub places: Vec<RawPlace>,
    pub transitions: Vec<RawTransition>,
    pub input_arcs: Vec<RawArc>,
    pub output_arcs: Vec<RawArc>,
    /// Place id -> initial token count. Entries for undeclared places are ignored;
    /// missing entries default to 0.
    pub initial_marking: BTreeMap<String, u32>,
}

/// An immutable 1-safe Petri net: an ordered place list, an ordered transition list, the
/// input and output incidence matrices (stored per-transition as bitmasks, since no arc
/// multiplicity above 1 survives 1-safe semantics), and the initial marking.
#[derive(Debug, Clone)]
pub struct Net {
    place_ids: Vec<String>,
    place_names: Vec<Option<String>>,
    place_index: AHashMap<String, PlaceId>,
    transition_ids: Vec<String>,
    transition_names: Vec<Option<String>>,
    transition_index: AHashMap<String, TransitionId>,
    /// `input[t]`: places consumed by transition `t`, as a bitmask over place indices.
    input: Vec<Bitmask>,
    /// `output[t]`: places produced by transition `t`.
    output: Vec<Bitmask>,
    initial_marking: Marking,
}

impl Net {
    /// Construct directly from validated components, rejecting any initial marking
    /// component greater than 1 rather than clamping it. This is the constructor for
    /// code that builds a net programmatically (tests, the seed scenarios) rather than
    /// through the lenient parser boundary; per the data model's invariant that
    /// `|M₀| = |P|` with every component in `{0,1}`, an out-of-range component here is a
    /// malformed net, not a normalization step.
    pub fn new(
        place_ids: Vec<String>,
        place_names: Vec<Option<String>>,
        transition_ids: Vec<String>,
        transition_names: Vec<Option<String>>,
        input: Vec<Bitmask>,
        output: Vec<Bitmask>,
        initial_marking: Marking,
    ) -> Result<Self> {
        if initial_marking.len() != place_ids.len() {
            return Err(Error::NetMalformed(format!(
                "initial marking has {} components but there are {} places",
                initial_marking.len(),
                place_ids.len()
            )));
        }
        Self::check_unique(&place_ids, "place")?;
        Self::check_unique(&transition_ids, "transition")?;

        let place_index = place_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), PlaceId(i)))
            .collect();
        let transition_index = transition_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), TransitionId(i)))
            .collect();

        Ok(Net {
            place_ids,
            place_names,
            place_index,
            transition_ids,
            transition_names,
            transition_index,
            input,
            output,
            initial_marking,
        })
    }

    fn check_unique(ids: &[String], kind: &str) -> Result<()> {
        let mut seen = ahash::AHashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::NetMalformed(format!(
                    "duplicate {kind} identifier {id:?}"
                )));
            }
        }
        Ok(())
    }

    /// Build a net from the parser contract's raw form. Arcs naming an unknown place or
    /// transition are dropped silently, matching the parser's lenience. An initial
    /// marking entry greater than 0 is clamped to 1, rather than rejected, per the
    /// contract's "any positive value is clamped to 1" rule — this is the one seam where
    /// clamping (not rejection) is the documented behavior, unlike [`Net::new`].
    pub fn from_raw(raw: RawNetInput) -> Result<Self> {
        let place_ids: Vec<String> = raw.places.iter().map(|p| p.id.clone()).collect();
        let place_names: Vec<Option<String>> = raw.places.iter().map(|p| p.name.clone()).collect();
        let transition_ids: Vec<String> = raw.transitions.iter().map(|t| t.id.clone()).collect();
        let transition_names: Vec<Option<String>> =
            raw.transitions.iter().map(|t| t.name.clone()).collect();

        Self::check_unique(&place_ids, "place")?;
        Self::check_unique(&transition_ids, "transition")?;

        let place_index: AHashMap<String, PlaceId> = place_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), PlaceId(i)))
            .collect();
        let transition_index: AHashMap<String, TransitionId> = transition_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), TransitionId(i)))
            .collect();

        let num_places = place_ids.len();
        let mut input = vec![Bitmask::new(num_places); transition_ids.len()];
        let mut output = vec![Bitmask::new(num_places); transition_ids.len()];

        for arc in &raw.input_arcs {
            let (Some(&p), Some(&t)) = (
                place_index.get(&arc.place),
                transition_index.get(&arc.transition),
            ) else {
                continue;
            };
            input[t.0] = set_bit(input[t.0], p.0, num_places);
        }
        for arc in &raw.output_arcs {
            let (Some(&p), Some(&t)) = (
                place_index.get(&arc.place),
                transition_index.get(&arc.transition),
            ) else {
                continue;
            };
            output[t.0] = set_bit(output[t.0], p.0, num_places);
        }

        let initial_marking: Marking = place_ids
            .iter()
            .map(|id| raw.initial_marking.get(id).copied().unwrap_or(0) > 0)
            .collect();

        Ok(Net {
            place_ids,
            place_names,
            place_index,
            transition_ids,
            transition_names,
            transition_index,
            input,
            output,
            initial_marking,
        })
    }

    pub fn num_places(&self) -> usize {
        self.place_ids.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transition_ids.len()
    }

    pub fn place_id(&self, p: PlaceId) -> &str {
        &self.place_ids[p.0]
    }

    pub fn place_display_name(&self, p: PlaceId) -> &str {
        self.place_names[p.0].as_deref().unwrap_or(&self.place_ids[p.0])
    }

    pub fn transition_id(&self, t: TransitionId) -> &str {
        &self.transition_ids[t.0]
    }

    pub fn transition_display_name(&self, t: TransitionId) -> &str {
        self.transition_names[t.0]
            .as_deref()
            .unwrap_or(&self.transition_ids[t.0])
    }

    pub fn place_by_id(&self, id: &str) -> Option<PlaceId> {
        self.place_index.get(id).copied()
    }

    pub fn transition_by_id(&self, id: &str) -> Option<TransitionId> {
        self.transition_index.get(id).copied()
    }

    pub fn places(&self) -> impl Iterator<Item = PlaceId> {
        (0..self.num_places()).map(PlaceId)
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> {
        (0..self.num_transitions()).map(TransitionId)
    }

    pub fn input_of(&self, t: TransitionId) -> &Bitmask {
        &self.input[t.0]
    }

    pub fn output_of(&self, t: TransitionId) -> &Bitmask {
        &self.output[t.0]
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.initial_marking
    }

    /// `true` iff `t` has neither input nor output places — skipped during transition
    /// relation construction, since it can never change or be conditioned on a marking.
    pub fn is_null_transition(&self, t: TransitionId) -> bool {
        self.input[t.0].raw() == 0 && self.output[t.0].raw() == 0
    }

    /// Is `t` fireable at bitmask `m`, and if so what marking does firing it produce?
    /// The 1-safe enabling test is `(m & I_t) == I_t`; the no-overflow test additionally
    /// requires that every place `t` produces but does not also consume is currently 0,
    /// since firing would otherwise push that place's token count above 1.
    pub fn try_fire(&self, t: TransitionId, m: &Bitmask) -> Option<Bitmask> {
        let i = &self.input[t.0];
        let o = &self.output[t.0];
        if !m.covers(i) {
            return None;
        }
        let produced_not_consumed = o.raw() & !i.raw();
        if m.raw() & produced_not_consumed != 0 {
            return None;
        }
        Some(m.fire(i, o))
    }

    pub fn is_fireable(&self, t: TransitionId, m: &Bitmask) -> bool {
        self.try_fire(t, m).is_some()
    }
}

fn set_bit(mask: Bitmask, index: usize, len: usize) -> Bitmask {
    Bitmask::from_raw(mask.raw() | (1u128 << index), len)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn from_raw_clamps_overmarked_place() {
        let raw = RawNetInput {
            places: vec![RawPlace { id: "p".into(), name: None }],
            transitions: vec![],
            input_arcs: vec![],
            output_arcs: vec![],
            initial_marking: BTreeMap::from([("p".to_string(), 7)]),
        };
        let net = Net::from_raw(raw).unwrap();
        assert!(net.initial_marking().get(0));
    }

    #[test]
    fn new_rejects_mismatched_marking_length() {
        let result = Net::new(
            vec!["p".into()],
            vec![None],
            vec![],
            vec![],
            vec![],
            vec![],
            Marking::zeros(2),
        );
        assert!(result.is_err());
    }

    #[test]
    fn alternator_fires_both_ways() {
        let net = alternator();
        let t1 = net.transition_by_id("t1").unwrap();
        let t2 = net.transition_by_id("t2").unwrap();
        let m0 = net.initial_marking().to_bitmask();
        assert!(net.is_fireable(t1, &m0));
        assert!(!net.is_fireable(t2, &m0));
        let m1 = net.try_fire(t1, &m0).unwrap();
        assert!(net.is_fireable(t2, &m1));
        assert!(!net.is_fireable(t1, &m1));
        let back = net.try_fire(t2, &m1).unwrap();
        assert_eq!(back.raw(), m0.raw());
    }

    #[test]
    fn raw_arcs_with_unknown_endpoints_are_dropped() {
        let raw = RawNetInput {
            places: vec![RawPlace { id: "p".into(), name: None }],
            transitions: vec![RawTransition { id: "t".into(), name: None }],
            input_arcs: vec![RawArc {
                place: "ghost".into(),
                transition: "t".into(),
                multiplicity: 1,
            }],
            output_arcs: vec![],
            initial_marking: BTreeMap::new(),
        };
        let net = Net::from_raw(raw).unwrap();
        let t = net.transition_by_id("t").unwrap();
        assert_eq!(net.input_of(t).raw(), 0);
    }
}
