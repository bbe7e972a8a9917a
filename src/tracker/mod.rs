pub mod angle;
pub mod one_euro;
pub mod placement;

pub use angle::{shortest_angle_delta, wrap_angle};
pub use one_euro::{AdaptiveFilter, Channel, FilterParams, FilterState};
pub use placement::{PlacementTracker, TrackState};
