use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, Result};

/// Size of the drawing surface and of the video shown on it, in pixels.
///
/// Read from the display collaborator every frame; the core never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub display_width: f32,
    pub display_height: f32,
    pub video_width: f32,
    pub video_height: f32,
}

impl DisplayGeometry {
    pub fn new(display_width: f32, display_height: f32, video_width: f32, video_height: f32) -> Self {
        Self {
            display_width,
            display_height,
            video_width,
            video_height,
        }
    }

    /// All four dimensions must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            self.display_width,
            self.display_height,
            self.video_width,
            self.video_height,
        ];
        if dims.iter().all(|d| d.is_finite() && *d > 0.0) {
            Ok(())
        } else {
            Err(OverlayError::InvalidGeometry {
                display_width: self.display_width,
                display_height: self.display_height,
                video_width: self.video_width,
                video_height: self.video_height,
            })
        }
    }
}

/// 表示座標に変換された点。`scale` は映像ピクセル→表示ピクセルの倍率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPoint {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl MappedPoint {
    pub fn distance(&self, other: &MappedPoint) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Center-crop "cover" fit of a video inside a display surface.
///
/// The video is scaled uniformly until it fills the display; the overflowing
/// axis is cropped symmetrically. Built once per frame from the current
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverMapping {
    scale: f32,
    displayed_width: f32,
    displayed_height: f32,
    offset_x: f32,
    offset_y: f32,
}

impl CoverMapping {
    pub fn new(geometry: &DisplayGeometry) -> Result<Self> {
        geometry.validate()?;

        let video_aspect = geometry.video_width / geometry.video_height;
        let display_aspect = geometry.display_width / geometry.display_height;

        let mapping = if video_aspect > display_aspect {
            // 横長の映像: 高さを合わせて左右をクロップ
            let scale = geometry.display_height / geometry.video_height;
            let displayed_width = geometry.video_width * scale;
            Self {
                scale,
                displayed_width,
                displayed_height: geometry.display_height,
                offset_x: (geometry.display_width - displayed_width) / 2.0,
                offset_y: 0.0,
            }
        } else {
            // 縦長の映像: 幅を合わせて上下をクロップ
            let scale = geometry.display_width / geometry.video_width;
            let displayed_height = geometry.video_height * scale;
            Self {
                scale,
                displayed_width: geometry.display_width,
                displayed_height,
                offset_x: 0.0,
                offset_y: (geometry.display_height - displayed_height) / 2.0,
            }
        };
        Ok(mapping)
    }

    pub fn map(&self, norm_x: f32, norm_y: f32) -> MappedPoint {
        MappedPoint {
            x: norm_x * self.displayed_width + self.offset_x,
            y: norm_y * self.displayed_height + self.offset_y,
            scale: self.scale,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }
}

/// Maps one normalized video point into display pixels.
pub fn map_to_display(norm_x: f32, norm_y: f32, geometry: &DisplayGeometry) -> Result<MappedPoint> {
    Ok(CoverMapping::new(geometry)?.map(norm_x, norm_y))
}

/// 映像フレーム内の矩形（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Region of the video frame used for a still capture.
///
/// Crops the frame to the display aspect like the live preview does, then
/// widens the cropped axis by `padding_ratio` (clamped to the frame) so the
/// capture keeps a little more context than the preview showed.
pub fn capture_crop(geometry: &DisplayGeometry, padding_ratio: f32) -> Result<SourceRect> {
    geometry.validate()?;

    let w = geometry.video_width;
    let h = geometry.video_height;
    let target_aspect = geometry.display_width / geometry.display_height;
    let video_aspect = w / h;
    let pad = 1.0 + padding_ratio.max(0.0);

    let rect = if video_aspect > target_aspect {
        let width = (h * target_aspect * pad).min(w);
        SourceRect {
            x: (w - width) / 2.0,
            y: 0.0,
            width,
            height: h,
        }
    } else {
        let height = (w / target_aspect * pad).min(h);
        SourceRect {
            x: 0.0,
            y: (h - height) / 2.0,
            width: w,
            height,
        }
    };
    Ok(rect)
}
