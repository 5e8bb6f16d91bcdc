use crate::four_vector::FourVector;

use noisy_float::prelude::*;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use particle_id::ParticleID;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The momenta of all outgoing particles of one type in one event
pub type MomentumSet = Vec<FourVector>;

/// The weights of an event
///
/// The first entry is the central weight. Further entries are
/// weight variations. The vector sits behind a lock so that the
/// resampler can overwrite weights while events are shared with the
/// spatial index.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Weights(RwLock<Vec<N64>>);

impl Weights {
    /// Construct from a weight vector
    pub fn new(weights: Vec<N64>) -> Self {
        Self(RwLock::new(weights))
    }

    /// The number of weights
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Check if there are no weights
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// The central weight, i.e. the first weight entry
    ///
    /// Zero if the event carries no weights at all.
    pub fn central(&self) -> N64 {
        self.0.read().first().copied().unwrap_or(n64(0.))
    }

    /// A snapshot of all weights
    pub fn to_vec(&self) -> Vec<N64> {
        self.0.read().clone()
    }

    /// Shared read access to the weights
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<N64>> {
        self.0.read()
    }

    /// Exclusive write access to the weights
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<N64>> {
        self.0.write()
    }

    /// Overwrite all weights
    ///
    /// The number of new weights has to match the current number.
    pub fn set(&self, weights: &[N64]) {
        self.0.write().copy_from_slice(weights)
    }

    /// Extract the weight vector
    pub fn into_inner(self) -> Vec<N64> {
        self.0.into_inner()
    }
}

impl Clone for Weights {
    fn clone(&self) -> Self {
        Self::new(self.to_vec())
    }
}

impl PartialEq for Weights {
    fn eq(&self, other: &Self) -> bool {
        *self.0.read() == *other.0.read()
    }
}

impl Eq for Weights {}

impl From<Vec<N64>> for Weights {
    fn from(weights: Vec<N64>) -> Self {
        Self::new(weights)
    }
}

/// A scattering event
///
/// Outgoing particles are grouped by type, with a canonical order of
/// both the groups and the momenta inside each group. The event is
/// immutable after construction except for its weights.
#[derive(PartialEq, Eq, Debug, Clone, Default, Deserialize, Serialize)]
pub struct Event {
    id: usize,
    /// Event weights
    pub weights: Weights,

    outgoing_by_pid: Vec<(ParticleID, MomentumSet)>,
}

const EMPTY_SLICE: &[FourVector] = &[];

impl Event {
    /// The event id
    ///
    /// Assigned by the event store at push time, sequentially starting
    /// from zero.
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Outgoing particles, grouped by particle type
    pub fn outgoing(&self) -> &[(ParticleID, MomentumSet)] {
        self.outgoing_by_pid.as_slice()
    }

    /// The momenta of all outgoing particles with the given type
    pub fn outgoing_with_pid(&self, pid: ParticleID) -> &[FourVector] {
        let idx = self
            .outgoing_by_pid
            .binary_search_by(|probe| pid.cmp(&probe.0));
        if let Ok(idx) = idx {
            &self.outgoing_by_pid[idx].1
        } else {
            EMPTY_SLICE
        }
    }

    /// The number of weights
    pub fn n_weights(&self) -> usize {
        self.weights.len()
    }

    /// The central event weight
    pub fn central_weight(&self) -> N64 {
        self.weights.central()
    }
}

/// Build an [Event]
///
/// Outgoing particles can be added in any order. `build` groups them
/// by particle type and sorts the momenta inside each group, so that
/// events constructed from permuted inputs compare equal.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct EventBuilder {
    weights: Vec<N64>,
    outgoing: Vec<(ParticleID, FourVector)>,
}

impl EventBuilder {
    /// New event builder with no particles and no weights
    pub fn new() -> Self {
        Self::default()
    }

    /// New event builder with space for the given number of outgoing particles
    pub fn with_capacity(nout: usize) -> Self {
        Self {
            weights: Vec::new(),
            outgoing: Vec::with_capacity(nout),
        }
    }

    /// Add an outgoing particle with the given type and momentum
    pub fn add_outgoing(&mut self, pid: ParticleID, p: FourVector) -> &mut Self {
        self.outgoing.push((pid, p));
        self
    }

    /// Append a weight
    pub fn add_weight(&mut self, weight: N64) -> &mut Self {
        self.weights.push(weight);
        self
    }

    /// Construct the event
    pub fn build(self) -> Event {
        Event {
            id: 0,
            weights: self.weights.into(),
            outgoing_by_pid: group_by_pid(self.outgoing),
        }
    }
}

impl From<EventBuilder> for Event {
    fn from(b: EventBuilder) -> Self {
        b.build()
    }
}

fn group_by_pid(
    mut out: Vec<(ParticleID, FourVector)>,
) -> Vec<(ParticleID, MomentumSet)> {
    out.sort_unstable_by(|a, b| b.cmp(a));
    let mut outgoing_by_pid: Vec<(ParticleID, MomentumSet)> = Vec::new();
    for (id, p) in out {
        match outgoing_by_pid.last_mut() {
            Some((pid, v)) if *pid == id => v.push(p),
            _ => outgoing_by_pid.push((id, vec![p])),
        }
    }
    outgoing_by_pid
}

/// The structural profile of an event
///
/// Two events with the same shape have the same particle types with
/// the same multiplicities and the same number of weights. Only
/// events with equal shapes can be compared by a distance or merged
/// into a cell.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Default)]
pub struct EventShape {
    type_counts: Vec<(ParticleID, usize)>,
    n_weights: usize,
}

impl EventShape {
    /// Extract the shape of the given event
    pub fn of(event: &Event) -> Self {
        Self {
            type_counts: event
                .outgoing()
                .iter()
                .map(|(pid, p)| (*pid, p.len()))
                .collect(),
            n_weights: event.n_weights(),
        }
    }

    /// Check an event against this shape
    pub fn check(&self, event: &Event) -> Result<(), StructuralMismatch> {
        let found = Self::of(event);
        if *self == found {
            Ok(())
        } else {
            Err(StructuralMismatch {
                expected: self.clone(),
                found,
            })
        }
    }
}

/// Error: an event does not match the established event structure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("event structure {found:?} does not match expected structure {expected:?}")]
pub struct StructuralMismatch {
    /// The structure established by the first pushed event
    pub expected: EventShape,
    /// The structure of the offending event
    pub found: EventShape,
}

#[cfg(test)]
mod tests {
    use super::*;

    const JET: ParticleID = ParticleID::new(81);
    const LEPTON: ParticleID = ParticleID::new(11);

    fn dijet(weight: f64, p1: [f64; 4], p2: [f64; 4]) -> Event {
        let mut ev = EventBuilder::new();
        ev.add_weight(n64(weight));
        ev.add_outgoing(JET, p1.into());
        ev.add_outgoing(JET, p2.into());
        ev.build()
    }

    #[test]
    fn builder_canonical_order() {
        let p1 = [100., 30., 40., 0.];
        let p2 = [100., -30., -40., 0.];
        let ev1 = dijet(0.5, p1, p2);
        let ev2 = dijet(0.5, p2, p1);
        assert_eq!(ev1, ev2);
        assert_eq!(ev1.outgoing().len(), 1);
        assert_eq!(ev1.outgoing_with_pid(JET).len(), 2);
        assert!(ev1.outgoing_with_pid(LEPTON).is_empty());
    }

    #[test]
    fn builder_groups_types() {
        let mut ev = EventBuilder::new();
        ev.add_weight(n64(1.));
        ev.add_outgoing(JET, [10., 0., 0., 10.].into());
        ev.add_outgoing(LEPTON, [5., 3., 4., 0.].into());
        ev.add_outgoing(JET, [20., 0., 0., -20.].into());
        let ev = ev.build();
        assert_eq!(ev.outgoing().len(), 2);
        assert_eq!(ev.outgoing_with_pid(JET).len(), 2);
        assert_eq!(ev.outgoing_with_pid(LEPTON).len(), 1);
    }

    #[test]
    fn shape_mismatch() {
        let ev1 = dijet(1., [10., 0., 0., 10.], [10., 0., 0., -10.]);
        let shape = EventShape::of(&ev1);
        assert_eq!(shape.check(&ev1), Ok(()));

        // different multiplicity
        let mut ev2 = EventBuilder::new();
        ev2.add_weight(n64(1.));
        ev2.add_outgoing(JET, [10., 0., 0., 10.].into());
        let ev2 = ev2.build();
        assert!(shape.check(&ev2).is_err());

        // different number of weights
        let mut ev3 = EventBuilder::new();
        ev3.add_weight(n64(1.)).add_weight(n64(2.));
        ev3.add_outgoing(JET, [10., 0., 0., 10.].into());
        ev3.add_outgoing(JET, [10., 0., 0., -10.].into());
        let ev3 = ev3.build();
        assert!(shape.check(&ev3).is_err());
    }

    #[test]
    fn weight_overwrite() {
        let ev = dijet(-1., [10., 0., 0., 10.], [10., 0., 0., -10.]);
        assert_eq!(ev.central_weight(), n64(-1.));
        ev.weights.set(&[n64(0.)]);
        assert_eq!(ev.central_weight(), n64(0.));
    }
}
