//! `recell` is a streaming cell resampling library for Monte Carlo
//! event samples with negative weights.
//!
//! Events with possibly negative weights are pushed into a
//! [Resampler](resampler::Resampler). A resampling pass groups
//! phase-space neighbouring events into cells and redistributes the
//! weights inside each cell, cancelling local sign imbalance while
//! conserving the sum of weights. The adjusted weights are then
//! drained back out.
//!
//! # How to use
//!
//! Probably the best way to get started is to look at the examples,
//! starting with `demos/minimal.rs`.
//!
//! ## Most relevant modules
//!
//! - [prelude] exports a list of the most relevant classes and objects
//! - [resampler] contains the main class and the resampling pass
//! - [event] for the internal event format
//! - [distance] for user-defined distance functions
//! - [neighbour_search] for the nearest-neighbour search strategies
//!

/// Definition of event cells
pub mod cell;
/// Diagnostics for notable cells
pub mod cell_collector;
/// Distance functions
pub mod distance;
/// Scattering event class
pub mod event;
/// Four-vector class
pub mod four_vector;
/// Nearest-neighbour search algorithms
pub mod neighbour_search;
/// Most important exports
pub mod prelude;
/// Progress bar
pub mod progress_bar;
/// Cell resampling
pub mod resampler;
/// Event storage and draining
pub mod storage;
/// Vantage point tree
pub mod vptree;

use lazy_static::lazy_static;

pub use noisy_float::prelude::{n64, N64};
pub use particle_id::ParticleID;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
lazy_static! {
    pub static ref VERSION_MAJOR: u32 =
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap();
    pub static ref VERSION_MINOR: u32 =
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap();
    pub static ref VERSION_PATCH: u32 =
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap();
}
