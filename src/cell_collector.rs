use std::collections::{BTreeMap, HashMap};

use crate::cell::Cell;

use log::info;
use noisy_float::prelude::*;
use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};

const NCELLS: usize = 10;

/// Diagnostics collector recording notable cells of a resampling run
///
/// Keeps the first cells, a reservoir sample of random cells, and
/// the largest cells by radius, member count and weight sum. Only
/// event ids are stored, not the events themselves.
#[derive(Default, Clone, Debug)]
pub struct CellCollector {
    first: Vec<(usize, Vec<usize>)>,
    random: Vec<(usize, Vec<usize>)>,
    // the cell number is part of the key so that different cells
    // with the same radius etc. can be kept
    largest_by_radius: BTreeMap<(N64, usize), Vec<usize>>,
    largest_by_members: BTreeMap<(usize, usize), Vec<usize>>,
    largest_by_weight: BTreeMap<(N64, usize), Vec<usize>>,
    count: usize,
}

impl CellCollector {
    /// Construct a collector with empty records
    pub fn new() -> Self {
        Self {
            first: Vec::with_capacity(NCELLS),
            random: Vec::with_capacity(NCELLS),
            ..Default::default()
        }
    }

    /// Consider a finalized cell for the records
    pub fn collect<R: Rng>(&mut self, cell: &Cell, mut rng: R) {
        let count = self.count;
        let ids = || -> Vec<_> { cell.iter().map(|e| e.id()).collect() };
        let r = cell.radius();
        let nmembers = cell.nmembers();
        let weight = cell.weight_sum();
        if count < NCELLS {
            self.first.push((count, ids()));
            self.random.push((count, ids()));
            self.largest_by_radius.insert((r, count), ids());
            self.largest_by_members.insert((nmembers, count), ids());
            self.largest_by_weight.insert((weight, count), ids());
        } else {
            let (smallest_r, n) =
                *self.largest_by_radius.keys().next().unwrap();
            if r > smallest_r {
                self.largest_by_radius.remove(&(smallest_r, n)).unwrap();
                self.largest_by_radius.insert((r, count), ids());
            }
            let (least_members, n) =
                *self.largest_by_members.keys().next().unwrap();
            if nmembers > least_members {
                self.largest_by_members
                    .remove(&(least_members, n))
                    .unwrap();
                self.largest_by_members.insert((nmembers, count), ids());
            }
            let (smallest_weight, n) =
                *self.largest_by_weight.keys().next().unwrap();
            if weight > smallest_weight {
                self.largest_by_weight
                    .remove(&(smallest_weight, n))
                    .unwrap();
                self.largest_by_weight.insert((weight, count), ids());
            }
            // reservoir sampling over all cells seen so far
            let distr = Uniform::from(0..=count);
            let idx = distr.sample(&mut rng);
            if idx < self.random.len() {
                self.random[idx] = (count, ids());
            }
        }
        self.count += 1;
    }

    /// Write the collected records to the log
    pub fn dump_info(&self) {
        info!("Cells by creation order:");
        for (id, events) in &self.first {
            info!("Cell {} with {} events", id, events.len());
        }
        info!("Largest cells by radius:");
        for ((r, id), events) in self.largest_by_radius.iter().rev() {
            info!("Cell {} with {} events and radius {}", id, events.len(), r);
        }
        info!("Largest cells by number of events:");
        for ((_, id), events) in self.largest_by_members.iter().rev() {
            info!("Cell {} with {} events", id, events.len());
        }
        info!("Cells with largest accumulated weights:");
        for ((weight, id), events) in self.largest_by_weight.iter().rev() {
            info!(
                "Cell {} with {} events and weight {:e}",
                id,
                events.len(),
                weight
            );
        }
        info!("Randomly selected cells:");
        for (id, events) in &self.random {
            info!("Cell {} with {} events", id, events.len());
        }
    }

    /// Invert the records into a map from event id to cell numbers
    pub fn event_cells(&self) -> HashMap<usize, Vec<usize>> {
        let mut result: HashMap<usize, Vec<_>> = HashMap::new();
        let all_cells = self
            .first
            .iter()
            .map(|(id, events)| (*id, events))
            .chain(self.random.iter().map(|(id, events)| (*id, events)))
            .chain(
                self.largest_by_radius
                    .iter()
                    .map(|((_r, id), events)| (*id, events)),
            )
            .chain(
                self.largest_by_members
                    .iter()
                    .map(|((_n, id), events)| (*id, events)),
            )
            .chain(
                self.largest_by_weight
                    .iter()
                    .map(|((_w, id), events)| (*id, events)),
            );
        for (cell, event_ids) in all_cells {
            for event_id in event_ids {
                result.entry(*event_id).or_default().push(cell)
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DistWrapper, EuclWithScaledPt};
    use crate::event::EventBuilder;
    use crate::neighbour_search::{BruteForceSearch, NeighbourSearchAlgo};
    use crate::storage::EventStore;

    use particle_id::ParticleID;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    const JET: ParticleID = ParticleID::new(81);

    #[test]
    fn largest_by_members_tracks_largest() {
        // clusters of growing size at well-separated positions
        let mut store = EventStore::new();
        let nclusters = NCELLS + 3;
        for c in 0..nclusters {
            for _ in 0..=c {
                let x = 1000. * c as f64;
                let mut ev = EventBuilder::new();
                ev.add_weight(n64(1.));
                ev.add_outgoing(JET, [x + 100., x, 50., 0.].into());
                store.push(ev.build());
            }
        }
        let dist = EuclWithScaledPt::new(n64(0.));
        let mut search = BruteForceSearch::new_with_dist(
            store.surviving(),
            DistWrapper::new(&dist, &store),
        );
        let mut collector = CellCollector::new();
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let mut seed = 0;
        loop {
            let (cell, rejected) =
                crate::cell::Cell::grow(&store, seed, &mut search, n64(1.));
            collector.collect(&cell, &mut rng);
            match rejected {
                Some(next) => seed = next,
                None => break,
            }
        }
        let sizes: Vec<_> = collector
            .largest_by_members
            .keys()
            .map(|(n, _)| *n)
            .collect();
        // the NCELLS largest clusters, in ascending order
        let expected: Vec<_> = (4..=nclusters).collect();
        assert_eq!(sizes, expected);
    }
}
