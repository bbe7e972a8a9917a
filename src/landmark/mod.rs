pub mod index;
pub mod point;

pub use index::{FaceLandmark, HandLandmark, PoseLandmark};
pub use point::{LandmarkSet, NormalizedPoint};
