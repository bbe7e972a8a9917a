use crate::config::{AccessoryConfig, OffsetBasis, RotationPolicy};
use crate::error::Result;
use crate::geometry::{CoverMapping, DisplayGeometry};
use crate::landmark::LandmarkSet;
use crate::placement::Placement;

use super::anchors::extract_anchors;

/// Landmarks → placement for one accessory kind.
///
/// Geometry is passed on every call and never cached, so a viewport resize
/// takes effect on the next frame.
pub struct AccessoryResolver {
    config: AccessoryConfig,
}

impl AccessoryResolver {
    pub fn from_config(config: &AccessoryConfig) -> Self {
        Self { config: *config }
    }

    pub fn config(&self) -> &AccessoryConfig {
        &self.config
    }

    /// `Ok(None)` means the anchors were not usable this frame; an error
    /// means the geometry itself is unusable and the frame must be skipped.
    pub fn compute(&self, landmarks: &LandmarkSet, geometry: &DisplayGeometry) -> Result<Option<Placement>> {
        let mapping = CoverMapping::new(geometry)?;

        let anchors = match extract_anchors(self.config.kind, landmarks, self.config.min_visibility) {
            Some(anchors) => anchors,
            None => return Ok(None),
        };

        let from = mapping.map(anchors.scale_from.x, anchors.scale_from.y);
        let to = mapping.map(anchors.scale_to.x, anchors.scale_to.y);
        let scale = from.distance(&to);
        if !(scale.is_finite() && scale > 0.0) {
            log::debug!("{}: degenerate anchor distance {}", self.config.kind, scale);
            return Ok(None);
        }

        let angle = match self.config.rotation {
            RotationPolicy::FollowAnchors => f32::atan2(to.y - from.y, to.x - from.x),
            RotationPolicy::Upright => 0.0,
        };

        let n = anchors.centroid.len() as f32;
        let (sum_x, sum_y) = anchors
            .centroid
            .iter()
            .map(|p| mapping.map(p.x, p.y))
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let center_x = sum_x / n;
        let center_y = sum_y / n;

        let width = scale * self.config.size_ratio;
        let height = width * self.config.image_aspect;
        let basis = match self.config.offset_basis {
            OffsetBasis::Height => height,
            OffsetBasis::Scale => scale,
        };

        Ok(Some(Placement::new(
            center_x,
            center_y + basis * self.config.y_offset_ratio,
            width,
            height,
            angle,
        )))
    }
}
