pub mod overlay;

pub use overlay::{clear, OverlayRenderer, MIN_VISIBLE_OPACITY};
