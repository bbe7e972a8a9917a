pub mod accessory;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landmark;
pub mod pipeline;
pub mod placement;
pub mod render;
pub mod replay;
pub mod session;
pub mod tracker;

pub use error::{OverlayError, Result};
