use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::Cell;
use crate::cell_collector::CellCollector;
use crate::distance::{DistWrapper, Distance, EuclWithScaledPt};
use crate::event::{Event, EventShape, StructuralMismatch};
use crate::neighbour_search::{
    BruteForceSearch, NeighbourSearchAlgo, Search, TreeSearch,
};
use crate::progress_bar::{Progress, ProgressBar};
use crate::storage::EventStore;

use log::{debug, info, warn};
use noisy_float::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use thiserror::Error;

/// Error: no event is left to seed a cell
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no surviving event to seed a cell (requested seed: {seed:?})")]
pub struct SeedNotFound {
    /// The seed requested by the caller, if any
    pub seed: Option<usize>,
}

/// The cell resampler
///
/// Events are pushed in, merged into cells of phase-space neighbours
/// by [resample](Self::resample), and drained back out through
/// [next_weights](Self::next_weights). Pushes and resampling passes
/// may interleave; each pass only treats events that have not been
/// consumed by an earlier pass.
#[derive(Debug)]
pub struct Resampler<D = EuclWithScaledPt> {
    distance: D,
    neighbour_search: Search,
    store: EventStore,
    shape: Option<EventShape>,
    cell_collector: Option<Rc<RefCell<CellCollector>>>,
}

impl<D: Distance + Send + Sync> Resampler<D> {
    /// Reserve space for `cap` additional events
    ///
    /// Purely an optimization hint.
    pub fn reserve(&mut self, cap: usize) {
        self.store.reserve(cap);
    }

    /// Add an event, returning its assigned id
    ///
    /// The first pushed event establishes the expected event
    /// structure. Pushing an event with different particle types,
    /// multiplicities or weight count fails and leaves the resampler
    /// unchanged.
    pub fn push_event(
        &mut self,
        event: Event,
    ) -> Result<usize, StructuralMismatch> {
        match &self.shape {
            Some(shape) => shape.check(&event)?,
            None => self.shape = Some(EventShape::of(&event)),
        }
        Ok(self.store.push(event))
    }

    /// Run one resampling pass over all surviving events
    ///
    /// Cells grow from the event with id `seed`, or from the
    /// least-recently pushed surviving event if `seed` is unset or no
    /// longer surviving. Each cell stops growing at the first
    /// neighbour farther than `max_cell_size` from the cell seed;
    /// that neighbour seeds the next cell. A `max_cell_size` of
    /// infinity merges all surviving events into a single cell.
    ///
    /// Weights are redistributed within each cell such that the sum
    /// of each weight entry over the cell is conserved. After the
    /// pass all previously surviving events are consumed and ready to
    /// be drained.
    ///
    /// Fails without redistributing anything if there is no surviving
    /// event.
    pub fn resample(
        &mut self,
        seed: Option<usize>,
        max_cell_size: N64,
    ) -> Result<(), SeedNotFound> {
        let survivors = self.store.surviving();
        let Some(&first_survivor) = survivors.first() else {
            return Err(SeedNotFound { seed });
        };
        let start = match seed {
            Some(id) if self.store.is_surviving(id) => id,
            _ => first_survivor,
        };

        let xs: N64 =
            survivors.iter().map(|&id| self.store.event(id).central_weight()).sum();
        let sum_wtsqr: N64 = survivors
            .iter()
            .map(|&id| {
                let w = self.store.event(id).central_weight();
                w * w
            })
            .sum();
        info!(
            "Initial cross section: σ = {:.3e} ± {:.3e}",
            xs,
            sum_wtsqr.sqrt()
        );

        let cells = match self.neighbour_search {
            Search::Tree => {
                self.grow_cells::<TreeSearch>(survivors, start, max_cell_size)
            }
            Search::BruteForce => self.grow_cells::<BruteForceSearch>(
                survivors,
                start,
                max_cell_size,
            ),
        };
        let mut xs_new = n64(0.);
        for members in &cells {
            xs_new += members
                .iter()
                .map(|&id| self.store.event(id).central_weight())
                .sum::<N64>();
            self.store.commit_cell(members);
        }
        info!("Final cross section: σ = {:.3e}", xs_new);
        if let Some(collector) = &self.cell_collector {
            collector.borrow().dump_info();
        }
        Ok(())
    }

    fn grow_cells<NS: NeighbourSearchAlgo>(
        &self,
        survivors: Vec<usize>,
        start: usize,
        max_cell_size: N64,
    ) -> Vec<Vec<usize>> {
        let nevents = survivors.len();
        let dist = DistWrapper::new(&self.distance, &self.store);
        let mut search = NS::new_with_dist(survivors, dist);
        let progress = ProgressBar::new(nevents as u64, "events treated:");
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let mut cells = Vec::new();
        let mut cell_radii = Vec::new();
        let mut nneg = 0;
        let mut seed = start;
        loop {
            let (cell, rejected) =
                Cell::grow(&self.store, seed, &mut search, max_cell_size);
            debug!(
                "New cell with {} events, radius {}, and weight {:e}",
                cell.nmembers(),
                cell.radius(),
                cell.weight_sum()
            );
            progress.inc(cell.nmembers() as u64);
            cell_radii.push(cell.radius());
            if cell.weight_sum() < 0. {
                nneg += 1;
            }
            cell.resample();
            if let Some(collector) = &self.cell_collector {
                collector.borrow_mut().collect(&cell, &mut rng);
            }
            cells.push(cell.into_members());
            match rejected {
                Some(next) => seed = next,
                None => break,
            }
        }
        progress.finish();
        info!("Created {} cells", cells.len());
        if nneg > 0 {
            warn!("{} cells had negative weight!", nneg);
        }
        info!("Median radius: {:.3}", median_radius(&mut cell_radii));
        cells
    }

    /// Retrieve the weights of the next consumed event
    ///
    /// Events drain in reverse order of cell finalization: weights of
    /// events consumed in a later cell come out first. Each event can
    /// be drained at most once; draining releases its storage.
    /// Returns `None` once all consumed events have been drained.
    pub fn next_weights(&mut self) -> Option<Vec<N64>> {
        self.store.next_weights()
    }

    /// The total number of events pushed so far
    pub fn n_events(&self) -> usize {
        self.store.len()
    }

    /// The number of events not yet consumed by a resampling pass
    pub fn n_surviving(&self) -> usize {
        self.store.n_surviving()
    }

    /// Access the cell collector, if one was installed
    pub fn cell_collector(&self) -> Option<Rc<RefCell<CellCollector>>> {
        self.cell_collector.clone()
    }
}

impl Default for Resampler<EuclWithScaledPt> {
    fn default() -> Self {
        ResamplerBuilder::default().build()
    }
}

fn median_radius(radii: &mut [N64]) -> N64 {
    radii.sort_unstable();
    radii[radii.len() / 2]
}

/// Construct a [Resampler]
///
/// The builder is hand-written since replacing the distance changes
/// the type parameter.
pub struct ResamplerBuilder<D = EuclWithScaledPt> {
    distance: D,
    neighbour_search: Search,
    cell_collector: Option<Rc<RefCell<CellCollector>>>,
}

impl Default for ResamplerBuilder<EuclWithScaledPt> {
    fn default() -> Self {
        Self {
            distance: EuclWithScaledPt::default(),
            neighbour_search: Search::default(),
            cell_collector: None,
        }
    }
}

impl<D> ResamplerBuilder<D> {
    /// Set the nearest-neighbour search strategy
    pub fn neighbour_search(mut self, neighbour_search: Search) -> Self {
        self.neighbour_search = neighbour_search;
        self
    }

    /// Install a collector recording notable cells
    pub fn cell_collector(
        mut self,
        cell_collector: Rc<RefCell<CellCollector>>,
    ) -> Self {
        self.cell_collector = Some(cell_collector);
        self
    }

    /// Replace the distance function
    pub fn distance<DD>(self, distance: DD) -> ResamplerBuilder<DD> {
        ResamplerBuilder {
            distance,
            neighbour_search: self.neighbour_search,
            cell_collector: self.cell_collector,
        }
    }

    /// Build the [Resampler]
    pub fn build(self) -> Resampler<D> {
        let Self {
            distance,
            neighbour_search,
            cell_collector,
        } = self;
        Resampler {
            distance,
            neighbour_search,
            store: EventStore::new(),
            shape: None,
            cell_collector,
        }
    }
}

impl ResamplerBuilder<EuclWithScaledPt> {
    /// Set the transverse-momentum weight of the default distance
    pub fn pt_weight(self, pt_weight: N64) -> Self {
        self.distance(EuclWithScaledPt::new(pt_weight))
    }
}
