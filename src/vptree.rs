use std::collections::HashMap;
use std::hash::Hash;

use log::{debug, trace};
use noisy_float::prelude::*;
use rayon::prelude::*;

use crate::distance::Distance;

/// A vantage point tree
///
/// Points are partitioned recursively: each vantage point splits the
/// remaining points at the median distance into an inside and an
/// outside set. Queries prune subtrees using the triangle
/// inequality, so the distance has to be a metric.
///
/// The set of points is mutable. Removal marks the corresponding
/// node as dead, insertion goes into a buffer of pending points that
/// is scanned linearly during queries. Once dead or pending points
/// dominate the tree is rebuilt from scratch, so the cost of
/// restructuring is amortized over many updates.
#[derive(Clone, Debug, Default)]
pub struct VPTree<P, D> {
    dist: D,
    nodes: Vec<Node<P>>,
    // node position by point, only valid for points inside `nodes`
    pos: HashMap<P, usize>,
    pending: Vec<P>,
    ndead: usize,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
struct Node<P> {
    vantage_pt: P,
    dead: bool,
    children: Option<Children>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
struct Children {
    radius: N64,
    outside_offset: usize,
}

// trees smaller than this are never worth rebuilding
const MIN_REBUILD_SIZE: usize = 16;

impl<P, D> VPTree<P, D>
where
    P: Copy + Eq + Hash + Send + Sync,
    D: Distance<P> + Send + Sync,
{
    /// Construct a tree over the given points
    pub fn new_with_dist(pts: Vec<P>, dist: D) -> Self {
        let mut tree = Self {
            dist,
            nodes: Vec::new(),
            pos: HashMap::new(),
            pending: Vec::new(),
            ndead: 0,
        };
        tree.rebuild_from(pts);
        tree
    }

    /// The number of live points
    pub fn len(&self) -> usize {
        self.nodes.len() - self.ndead + self.pending.len()
    }

    /// Check if there are no live points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a point
    ///
    /// The point is visible to queries immediately. It enters the
    /// tree structure proper with the next rebuild.
    pub fn insert(&mut self, pt: P) {
        self.pending.push(pt);
        self.maybe_rebuild();
    }

    /// Remove a point
    ///
    /// Returns `false` if the point was not present.
    pub fn remove(&mut self, pt: &P) -> bool {
        if let Some(idx) = self.pending.iter().position(|p| p == pt) {
            self.pending.swap_remove(idx);
            return true;
        }
        let Some(&idx) = self.pos.get(pt) else {
            return false;
        };
        if self.nodes[idx].dead {
            return false;
        }
        self.nodes[idx].dead = true;
        self.ndead += 1;
        self.maybe_rebuild();
        true
    }

    /// Find the live point closest to `pt`
    ///
    /// The point `pt` itself is never returned. The result is `None`
    /// if there is no other live point.
    pub fn nearest(&self, pt: &P) -> Option<(P, N64)> {
        trace!("nearest neighbour search among {} points", self.len());
        let mut nearest = self.nearest_in_subtree(&self.nodes, pt);
        for cand in &self.pending {
            if cand == pt {
                continue;
            }
            let d = self.dist.distance(pt, cand);
            if nearest.map_or(true, |(_, dn)| d < dn) {
                nearest = Some((*cand, d));
            }
        }
        nearest
    }

    fn nearest_in_subtree<'a>(
        &self,
        subtree: &'a [Node<P>],
        pt: &P,
    ) -> Option<(P, N64)> {
        let (vp, rest) = subtree.split_first()?;
        let d = self.dist.distance(pt, &vp.vantage_pt);
        let mut nearest = if !vp.dead && vp.vantage_pt != *pt {
            Some((vp.vantage_pt, d))
        } else {
            None
        };
        let Some(children) = &vp.children else {
            return nearest;
        };
        let (mut first, mut second) = rest.split_at(children.outside_offset);
        if d > children.radius {
            // the query point lies outside, search there first
            std::mem::swap(&mut first, &mut second);
        }
        if let Some((p, dsub)) = self.nearest_in_subtree(first, pt) {
            if nearest.map_or(true, |(_, dn)| dsub < dn) {
                nearest = Some((p, dsub));
            }
        }
        // triangle inequality: skip the less promising subtree if no
        // point inside it can beat the best match so far
        if let Some((_, dn)) = nearest {
            if dn < (children.radius - d).abs() {
                return nearest;
            }
        }
        if let Some((p, dsub)) = self.nearest_in_subtree(second, pt) {
            if nearest.map_or(true, |(_, dn)| dsub < dn) {
                nearest = Some((p, dsub));
            }
        }
        nearest
    }

    fn maybe_rebuild(&mut self) {
        let total = self.nodes.len() + self.pending.len();
        if total < MIN_REBUILD_SIZE {
            return;
        }
        let nalive = self.nodes.len() - self.ndead;
        if 2 * self.ndead > self.nodes.len() || self.pending.len() > nalive {
            let mut pts = Vec::with_capacity(self.len());
            pts.extend(
                self.nodes.iter().filter(|n| !n.dead).map(|n| n.vantage_pt),
            );
            pts.append(&mut self.pending);
            self.rebuild_from(pts);
        }
    }

    fn rebuild_from(&mut self, pts: Vec<P>) {
        debug!("(re)building vantage point tree over {} points", pts.len());
        let mut pts = Vec::from_iter(pts.into_iter().map(|vantage_pt| {
            // the first tuple entry stores distances during the build
            (
                n64(0.),
                Node {
                    vantage_pt,
                    dead: false,
                    children: None,
                },
            )
        }));
        if let Some(corner) = self.find_corner_pt(&pts) {
            let last_idx = pts.len() - 1;
            pts.swap(corner, last_idx);
        }
        Self::build_tree(&self.dist, &mut pts);
        self.nodes = pts.into_iter().map(|(_d, n)| n).collect();
        self.pos = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.vantage_pt, idx))
            .collect();
        self.pending.clear();
        self.ndead = 0;
    }

    // Index of the point farthest from the first point, to serve as
    // the first vantage point. Starting from a corner of the space
    // gives more balanced splits than an arbitrary centre point.
    fn find_corner_pt(&self, pts: &[(N64, Node<P>)]) -> Option<usize> {
        let (first, rest) = pts.split_first()?;
        let max = rest
            .par_iter()
            .enumerate()
            .max_by_key(|(_, (_, n))| {
                self.dist.distance(&first.1.vantage_pt, &n.vantage_pt)
            })
            .map(|(pos, _)| pos + 1);
        max.or(Some(0))
    }

    // Recursively build the subtree over `pts`:
    //
    // 1. Take the point farthest from the parent vantage point as
    //    the next vantage point.
    //
    // 2. Compute the distances of all remaining points to it.
    //
    // 3. The half with distances below the median forms the inside
    //    subtree, the other half the outside subtree.
    fn build_tree(dist: &D, pts: &mut [(N64, Node<P>)]) {
        if pts.len() < 2 {
            return;
        }
        pts.swap(0, pts.len() - 1);
        let (vp, pts) = pts.split_first_mut().unwrap();
        pts.par_iter_mut().for_each(|(d, pt)| {
            *d = dist.distance(&vp.1.vantage_pt, &pt.vantage_pt)
        });
        pts.sort_unstable_by_key(|(d, _)| *d);
        let median_idx = pts.len() / 2;
        let (inside, outside) = pts.split_at_mut(median_idx);
        vp.1.children = Some(Children {
            radius: outside.first().unwrap().0,
            outside_offset: median_idx,
        });
        Self::build_tree(dist, inside);
        Self::build_tree(dist, outside);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AbsDiff;

    impl Distance<i32> for AbsDiff {
        fn distance(&self, a: &i32, b: &i32) -> N64 {
            n64((a - b).abs() as f64)
        }
    }

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tree(pts: impl IntoIterator<Item = i32>) -> VPTree<i32, AbsDiff> {
        VPTree::new_with_dist(Vec::from_iter(pts), AbsDiff)
    }

    #[test]
    fn nearest() {
        log_init();

        let t = tree([]);
        assert_eq!(t.nearest(&0), None);

        let t = tree([0]);
        assert_eq!(t.nearest(&-1), Some((0, n64(1.))));
        // the query point itself is excluded
        assert_eq!(t.nearest(&0), None);

        let t = tree([0, 1]);
        assert_eq!(t.nearest(&0), Some((1, n64(1.))));
        assert_eq!(t.nearest(&1), Some((0, n64(1.))));
        assert_eq!(t.nearest(&2), Some((1, n64(1.))));

        let t = tree([0, 1, 4]);
        assert_eq!(t.nearest(&3), Some((4, n64(1.))));

        let t = tree([0, 1, 2, 3]);
        assert_eq!(t.nearest(&5), Some((3, n64(2.))));
        assert_eq!(t.nearest(&-5), Some((0, n64(5.))));
    }

    #[test]
    fn removal() {
        log_init();

        let mut t = tree([0, 1, 4]);
        assert!(t.remove(&1));
        assert!(!t.remove(&1));
        assert_eq!(t.len(), 2);
        assert_eq!(t.nearest(&0), Some((4, n64(4.))));
        assert!(t.remove(&4));
        // querying from a removed point is still allowed
        assert_eq!(t.nearest(&4), Some((0, n64(4.))));
        assert!(t.remove(&0));
        assert_eq!(t.nearest(&0), None);
        assert!(t.is_empty());
    }

    #[test]
    fn pending_inserts_are_visible() {
        log_init();

        let mut t = tree([0, 10]);
        t.insert(4);
        assert_eq!(t.len(), 3);
        assert_eq!(t.nearest(&0), Some((4, n64(4.))));
        assert_eq!(t.nearest(&4), Some((0, n64(4.))));
        assert!(t.remove(&4));
        assert_eq!(t.nearest(&0), Some((10, n64(10.))));
    }

    #[test]
    fn heavy_deletion_triggers_rebuild() {
        log_init();

        let mut t = tree(0..100);
        for n in 0..99 {
            assert_eq!(t.nearest(&n), Some((n + 1, n64(1.))));
            assert!(t.remove(&n));
        }
        assert_eq!(t.len(), 1);
        assert_eq!(t.nearest(&0), Some((99, n64(99.))));
        assert!(t.remove(&99));
        assert!(t.is_empty());
    }

    #[test]
    fn interleaved_updates() {
        log_init();

        let mut t = tree([]);
        for n in 0..50 {
            t.insert(2 * n);
        }
        assert_eq!(t.len(), 50);
        assert_eq!(t.nearest(&99), Some((98, n64(1.))));
        for n in 0..25 {
            assert!(t.remove(&(4 * n)));
        }
        assert_eq!(t.len(), 25);
        assert_eq!(t.nearest(&0), Some((2, n64(2.))));
        t.insert(1);
        assert_eq!(t.nearest(&0), Some((1, n64(1.))));
    }
}
