use crate::event::Event;
use crate::four_vector::FourVector;
use crate::storage::EventStore;

use noisy_float::prelude::*;
use permutohedron::LexicalPermutation;

/// A metric (distance function) in the space of all events
///
/// Implementations may assume that the two events are structurally
/// compatible, i.e. have the same particle types with the same
/// multiplicities. The resampler validates this at push time.
pub trait Distance<E = Event> {
    /// Compute the distance between two events
    fn distance(&self, ev1: &E, ev2: &E) -> N64;
}

impl<D, E> Distance<E> for &D
where
    D: Distance<E>,
{
    fn distance(&self, ev1: &E, ev2: &E) -> N64 {
        (*self).distance(ev1, ev2)
    }
}

/// Wrapper turning an event metric into a metric over event ids
///
/// Spatial indices work on event ids; this wrapper looks the events
/// up in the store.
#[derive(Debug)]
pub struct DistWrapper<'a, 'b, D> {
    ev_dist: &'a D,
    store: &'b EventStore,
}

impl<'a, 'b, D: Distance> DistWrapper<'a, 'b, D> {
    /// Construct a distance over event ids
    pub fn new(ev_dist: &'a D, store: &'b EventStore) -> Self {
        Self { ev_dist, store }
    }
}

impl<D: Distance> Distance<usize> for DistWrapper<'_, '_, D> {
    fn distance(&self, ev1: &usize, ev2: &usize) -> N64 {
        self.ev_dist
            .distance(self.store.event(*ev1), self.store.event(*ev2))
    }
}

// maximum momentum set size for which we minimize over all pairings
const FALLBACK_SIZE: usize = 8;

/// The default phase-space distance
///
/// For each pair of matched outgoing particles the distance combines
/// the euclidean difference of the spatial momentum components with
/// the difference in transverse momentum scaled by the `pt_weight`
/// parameter, added in quadrature. Same-type momentum sets are
/// matched by the pairing that minimizes the summed distance; for
/// large sets a greedy norm-ordered pairing is used instead.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct EuclWithScaledPt {
    pt_weight: N64,
}

impl EuclWithScaledPt {
    /// Distance with the given transverse-momentum weight
    ///
    /// `pt_weight` enhances the influence of high-pt particles;
    /// zero gives uniform weighting of all momentum components.
    pub fn new(pt_weight: N64) -> Self {
        EuclWithScaledPt { pt_weight }
    }
}

impl Distance for EuclWithScaledPt {
    fn distance(&self, ev1: &Event, ev2: &Event) -> N64 {
        debug_assert_eq!(ev1.outgoing().len(), ev2.outgoing().len());
        ev1.outgoing()
            .iter()
            .zip(ev2.outgoing())
            .map(|((t1, p1), (t2, p2))| {
                debug_assert_eq!(t1, t2);
                self.set_distance(p1, p2)
            })
            .sum()
    }
}

impl EuclWithScaledPt {
    fn set_distance(&self, p1: &[FourVector], p2: &[FourVector]) -> N64 {
        debug_assert_eq!(p1.len(), p2.len());
        if p1.len() < FALLBACK_SIZE {
            self.min_paired_distance(p1, p2)
        } else {
            self.norm_ordered_paired_distance(p1, p2)
        }
    }

    fn min_paired_distance(&self, p1: &[FourVector], p2: &[FourVector]) -> N64 {
        let mut p1: Vec<_> = p1.to_vec();
        p1.sort_unstable();
        let mut min_dist = self.paired_distance(&p1, p2);
        while p1.next_permutation() {
            min_dist = std::cmp::min(min_dist, self.paired_distance(&p1, p2));
        }
        min_dist
    }

    fn paired_distance(&self, p1: &[FourVector], p2: &[FourVector]) -> N64 {
        p1.iter()
            .zip(p2.iter())
            .map(|(p1, p2)| pt_dist(p1, p2, self.pt_weight))
            .sum()
    }

    // greedy pairing: match each momentum to the nearest unmatched
    // partner, in both directions, and keep the smaller result
    fn norm_ordered_paired_distance(
        &self,
        p1: &[FourVector],
        p2: &[FourVector],
    ) -> N64 {
        std::cmp::min(
            self.greedy_paired_distance(p1, p2),
            self.greedy_paired_distance(p2, p1),
        )
    }

    fn greedy_paired_distance(
        &self,
        p1: &[FourVector],
        p2: &[FourVector],
    ) -> N64 {
        debug_assert_eq!(p1.len(), p2.len());
        let mut dists: Vec<_> = p2.iter().map(|q| (n64(0.), q)).collect();
        let mut dist = n64(0.);
        for p in p1 {
            for (dist, q) in &mut dists {
                *dist = pt_dist_sq(p, *q, self.pt_weight);
            }
            let (n, min) =
                dists.iter().enumerate().min_by_key(|(_n, d)| *d).unwrap();
            dist += min.0.sqrt();
            dists.swap_remove(n);
        }
        dist
    }
}

fn pt_dist(p: &FourVector, q: &FourVector, pt_weight: N64) -> N64 {
    pt_dist_sq(p, q, pt_weight).sqrt()
}

fn pt_dist_sq(p: &FourVector, q: &FourVector, pt_weight: N64) -> N64 {
    let dpt = pt_weight * (p.pt() - q.pt());
    (*p - *q).spatial_norm_sq() + dpt * dpt
}
