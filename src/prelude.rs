pub use crate::cell_collector::CellCollector;
pub use crate::distance::{Distance, EuclWithScaledPt};
pub use crate::event::{Event, EventBuilder};
pub use crate::four_vector::FourVector;
pub use crate::neighbour_search::Search;
pub use crate::resampler::{Resampler, ResamplerBuilder};
pub use crate::{n64, ParticleID, N64};
