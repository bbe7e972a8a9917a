use thiserror::Error;

/// Errors produced by the overlay core.
///
/// A missing or low-visibility anchor is not an error: resolvers return
/// `None` for it and the tracker fades the accessory out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    #[error(
        "invalid geometry: display {display_width}x{display_height}, video {video_width}x{video_height}"
    )]
    InvalidGeometry {
        display_width: f32,
        display_height: f32,
        video_width: f32,
        video_height: f32,
    },

    #[error("invalid image size {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
