use serde::Serialize;

/// On-screen pose of an accessory in display pixels.
///
/// `(x, y)` is the anchor; the image is drawn centred on
/// `(x, y + height / 2)` and rotated by `angle` radians about that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32, width: f32, height: f32, angle: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            angle,
        }
    }

    /// 描画中心 (回転の中心)
    pub fn draw_center(&self) -> (f32, f32) {
        (self.x, self.y + self.height / 2.0)
    }

    /// Rescales lengths and positions per axis; the angle is left untouched.
    pub fn scaled(&self, scale_x: f32, scale_y: f32) -> Self {
        Self {
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
            angle: self.angle,
        }
    }
}

/// Tracker output: a smoothed placement and its fade opacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedPlacement {
    #[serde(flatten)]
    pub placement: Placement,
    pub opacity: f32,
}

impl SmoothedPlacement {
    pub fn new(placement: Placement, opacity: f32) -> Self {
        Self { placement, opacity }
    }
}
