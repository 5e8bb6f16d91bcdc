use crate::distance::Distance;
use crate::vptree::VPTree;

use noisy_float::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Nearest-neighbour search strategy
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
pub enum Search {
    /// Search using a vantage point tree
    #[default]
    Tree,
    /// Naive linear search, as a correctness baseline
    BruteForce,
}

/// Spatial index over event ids
///
/// The resampler has exclusive access to the index, so none of the
/// operations has to be thread-safe.
pub trait NeighbourSearch {
    /// Add an event id to the index
    fn insert(&mut self, id: usize);

    /// Remove an event id from the index
    ///
    /// Returns `false` if the id was not present.
    fn remove(&mut self, id: usize) -> bool;

    /// Find the indexed event closest to the one with the given id
    ///
    /// The event itself is never its own neighbour. Returns `None`
    /// if the index contains no other event. The query id does not
    /// have to be in the index.
    fn nearest(&mut self, id: &usize) -> Option<(usize, N64)>;
}

/// Algorithm for nearest-neighbour searches
pub trait NeighbourSearchAlgo {
    /// Data structure holding the search index
    type Output<D: Distance<usize> + Send + Sync>: NeighbourSearch;

    /// Initialise the index over the given event ids
    fn new_with_dist<D: Distance<usize> + Send + Sync>(
        ids: Vec<usize>,
        d: D,
    ) -> Self::Output<D>;
}

/// Nearest-neighbour search using a vantage point tree
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TreeSearch {}

impl NeighbourSearchAlgo for TreeSearch {
    type Output<D: Distance<usize> + Send + Sync> = VPTree<usize, D>;

    fn new_with_dist<D: Distance<usize> + Send + Sync>(
        ids: Vec<usize>,
        d: D,
    ) -> Self::Output<D> {
        VPTree::new_with_dist(ids, d)
    }
}

impl<D: Distance<usize> + Send + Sync> NeighbourSearch for VPTree<usize, D> {
    fn insert(&mut self, id: usize) {
        VPTree::insert(self, id)
    }

    fn remove(&mut self, id: usize) -> bool {
        VPTree::remove(self, &id)
    }

    fn nearest(&mut self, id: &usize) -> Option<(usize, N64)> {
        VPTree::nearest(self, id)
    }
}

/// Naive nearest-neighbour search
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BruteForceSearch {}

/// Data for naive nearest-neighbour searches
///
/// Distances to the current query point are cached, so that repeated
/// queries from the same event only pay for one scan.
#[derive(Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BruteForceSearchData<D> {
    dist: D,
    cached_dist: Vec<(usize, N64)>,
    cached_for: Option<usize>,
}

impl NeighbourSearchAlgo for BruteForceSearch {
    type Output<D: Distance<usize> + Send + Sync> = BruteForceSearchData<D>;

    fn new_with_dist<D: Distance<usize> + Send + Sync>(
        ids: Vec<usize>,
        dist: D,
    ) -> Self::Output<D> {
        BruteForceSearchData {
            dist,
            cached_dist: ids.into_iter().map(|id| (id, n64(0.))).collect(),
            cached_for: None,
        }
    }
}

impl<D: Distance<usize> + Send + Sync> NeighbourSearch
    for BruteForceSearchData<D>
{
    fn insert(&mut self, id: usize) {
        let d = match self.cached_for {
            Some(q) => self.dist.distance(&q, &id),
            None => n64(0.),
        };
        self.cached_dist.push((id, d));
    }

    fn remove(&mut self, id: usize) -> bool {
        match self.cached_dist.iter().position(|(i, _)| *i == id) {
            Some(pos) => {
                self.cached_dist.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    fn nearest(&mut self, id: &usize) -> Option<(usize, N64)> {
        if self.cached_for != Some(*id) {
            let dist = &self.dist;
            self.cached_dist.par_iter_mut().for_each(|(i, d)| {
                *d = dist.distance(i, id);
            });
            self.cached_for = Some(*id);
        }
        self.cached_dist
            .iter()
            .filter(|(i, _)| i != id)
            .min_by_key(|(_, d)| *d)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DistWrapper, EuclWithScaledPt};
    use crate::event::EventBuilder;
    use crate::storage::EventStore;

    use particle_id::ParticleID;

    const JET: ParticleID = ParticleID::new(81);

    // a line of dijet events with geometrically increasing momentum
    // spread, so that all pairwise distances are distinct
    fn store(n: usize) -> EventStore {
        let mut store = EventStore::new();
        for i in 0..n {
            let x = (1.5f64).powi(i as i32);
            let mut ev = EventBuilder::new();
            ev.add_weight(n64(1.));
            ev.add_outgoing(JET, [100. + x, x, 50., 0.].into());
            ev.add_outgoing(JET, [100., -x, -50., 0.].into());
            store.push(ev.build());
        }
        store
    }

    #[test]
    fn tree_matches_brute_force() {
        let store = store(30);
        let dist = EuclWithScaledPt::new(n64(0.2));
        let ids = store.surviving();
        let mut tree =
            TreeSearch::new_with_dist(ids.clone(), DistWrapper::new(&dist, &store));
        let mut naive =
            BruteForceSearch::new_with_dist(ids, DistWrapper::new(&dist, &store));
        for id in 0..store.len() {
            assert_eq!(tree.nearest(&id), naive.nearest(&id));
        }
        // removal sequences keep them consistent
        for id in [3, 17, 0, 29, 11] {
            assert!(tree.remove(&id));
            assert!(naive.remove(id));
            for query in 0..store.len() {
                assert_eq!(tree.nearest(&query), naive.nearest(&query));
            }
        }
    }

    #[test]
    fn exhausting_the_index() {
        let store = store(5);
        let dist = EuclWithScaledPt::new(n64(0.));
        let mut search = BruteForceSearch::new_with_dist(
            store.surviving(),
            DistWrapper::new(&dist, &store),
        );
        for id in 0..4 {
            assert!(search.nearest(&id).is_some());
            assert!(search.remove(id));
        }
        // one survivor left, which cannot be its own neighbour
        assert_eq!(search.nearest(&4), None);
        assert!(search.remove(4));
        assert_eq!(search.nearest(&4), None);
        assert!(!search.remove(4));
    }
}
