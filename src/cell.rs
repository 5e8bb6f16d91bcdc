use crate::event::Event;
use crate::neighbour_search::NeighbourSearch;
use crate::storage::EventStore;

use itertools::zip_eq;
use log::{debug, trace};
use noisy_float::prelude::*;

/// A cell of phase-space neighbouring events
///
/// Cells are transient: they group the events consumed in one
/// redistribution step and are dropped once their members' weights
/// have been overwritten.
#[derive(Debug)]
pub struct Cell<'a> {
    store: &'a EventStore,
    members: Vec<usize>,
    radius: N64,
    weight_sum: N64,
}

impl<'a> Cell<'a> {
    /// Grow a cell starting from the given seed event
    ///
    /// Events join in order of increasing distance from the seed, as
    /// returned by the neighbour search. The seed and every joining
    /// event leave the search index. Growth stops at the first
    /// neighbour farther away than `max_cell_size`; that neighbour
    /// stays in the index and is returned alongside the cell so it
    /// can seed the next one. Growth also stops when the index is
    /// exhausted, in which case the second return value is `None`.
    pub fn grow<N: NeighbourSearch>(
        store: &'a EventStore,
        seed: usize,
        neighbour_search: &mut N,
        max_cell_size: N64,
    ) -> (Self, Option<usize>) {
        let mut weight_sum = store.event(seed).central_weight();
        debug!("new cell seeded by event {seed} with weight {weight_sum:e}");
        neighbour_search.remove(seed);
        let mut members = vec![seed];
        let mut radius = n64(0.);

        let rejected = loop {
            let Some((next, dist)) = neighbour_search.nearest(&seed) else {
                break None;
            };
            if dist > max_cell_size {
                break Some(next);
            }
            trace!(
                "adding event {next} with distance {dist}, weight {:e} to cell",
                store.event(next).central_weight()
            );
            neighbour_search.remove(next);
            weight_sum += store.event(next).central_weight();
            members.push(next);
            radius = dist;
        };
        let cell = Self {
            store,
            members,
            radius,
            weight_sum,
        };
        (cell, rejected)
    }

    /// Redistribute the weights of the cell members
    ///
    /// Every member weight is set to the mean weight over the cell,
    /// independently for each weight entry. This conserves the sum
    /// of each weight entry over the cell.
    pub fn resample(&self) {
        let mut avg = self.store.event(self.members[0]).weights.to_vec();
        for &id in &self.members[1..] {
            let weights = self.store.event(id).weights.read();
            for (acc, w) in zip_eq(&mut avg, weights.iter()) {
                *acc += *w;
            }
        }
        let inv_norm = n64(1. / self.nmembers() as f64);
        for wt in &mut avg {
            *wt *= inv_norm;
        }
        for &id in &self.members {
            self.store.event(id).weights.set(&avg);
        }
    }

    /// The seed event id
    pub fn seed(&self) -> usize {
        self.members[0]
    }

    /// Number of events in the cell
    pub fn nmembers(&self) -> usize {
        self.members.len()
    }

    /// Number of cell events with negative central weight
    pub fn nneg_weights(&self) -> usize {
        self.members
            .iter()
            .filter(|&&id| self.store.event(id).central_weight() < 0.)
            .count()
    }

    /// Cell radius
    ///
    /// The largest distance from the seed to any event in the cell.
    pub fn radius(&self) -> N64 {
        self.radius
    }

    /// Sum of central weights over the cell
    ///
    /// This is the sum over the original weights, unaffected by
    /// [resample](Self::resample).
    pub fn weight_sum(&self) -> N64 {
        self.weight_sum
    }

    /// Iterator over the cell members, seed first
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.members.iter().map(|id| self.store.event(*id))
    }

    /// The member event ids, in join order
    pub fn into_members(self) -> Vec<usize> {
        self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DistWrapper, EuclWithScaledPt};
    use crate::event::EventBuilder;
    use crate::neighbour_search::{BruteForceSearch, NeighbourSearchAlgo};

    use particle_id::ParticleID;

    const JET: ParticleID = ParticleID::new(81);

    fn store(weights: &[(f64, f64)]) -> EventStore {
        let mut store = EventStore::new();
        for (x, wt) in weights {
            let mut ev = EventBuilder::new();
            ev.add_weight(n64(*wt));
            ev.add_outgoing(JET, [100., *x, 50., 0.].into());
            ev.add_outgoing(JET, [100., -*x, -50., 0.].into());
            store.push(ev.build());
        }
        store
    }

    #[test]
    fn growth_stops_at_max_size() {
        // events at x = 0, 1, 2 and 10
        let store =
            store(&[(0., -1.), (1., 0.5), (2., 0.5), (10., 0.5)]);
        let dist = EuclWithScaledPt::new(n64(0.));
        let mut search = BruteForceSearch::new_with_dist(
            store.surviving(),
            DistWrapper::new(&dist, &store),
        );
        let (cell, rejected) =
            Cell::grow(&store, 0, &mut search, n64(4.));
        assert_eq!(cell.nmembers(), 3);
        assert_eq!(cell.seed(), 0);
        assert_eq!(cell.nneg_weights(), 1);
        assert_eq!(cell.weight_sum(), n64(0.));
        assert_eq!(rejected, Some(3));

        let (cell, rejected) =
            Cell::grow(&store, 3, &mut search, n64(4.));
        assert_eq!(cell.nmembers(), 1);
        assert_eq!(cell.radius(), n64(0.));
        assert_eq!(rejected, None);
    }

    #[test]
    fn resample_conserves_weight_sums() {
        let store = store(&[(0., -1.), (1., 2.), (2., 0.5)]);
        let dist = EuclWithScaledPt::new(n64(0.));
        let mut search = BruteForceSearch::new_with_dist(
            store.surviving(),
            DistWrapper::new(&dist, &store),
        );
        let (cell, _) =
            Cell::grow(&store, 0, &mut search, N64::infinity());
        let before: N64 =
            cell.iter().map(|ev| ev.central_weight()).sum();
        cell.resample();
        let after: N64 = cell.iter().map(|ev| ev.central_weight()).sum();
        assert!((before - after).abs() < 1e-12);
        for ev in cell.iter() {
            assert_eq!(ev.central_weight(), before / 3.);
        }
    }
}
