use crate::config::SmoothingConfig;
use crate::placement::{Placement, SmoothedPlacement};

use super::one_euro::AdaptiveFilter;

/// Lifecycle of a tracked accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// 未検出、またはフェード完了
    Empty,
    /// 検出中
    Tracking,
    /// 見失い、不透明度を減衰中
    Fading,
}

/// Smooths per-frame placements of one accessory and fades it out when
/// detection drops.
///
/// Owned by whoever runs that accessory's loop; trackers never share state.
pub struct PlacementTracker {
    x: AdaptiveFilter,
    y: AdaptiveFilter,
    width: AdaptiveFilter,
    height: AdaptiveFilter,
    angle: AdaptiveFilter,
    fade_duration_ms: f64,
    last_seen_ms: Option<f64>,
    last_smoothed: Option<Placement>,
    opacity: f32,
    state: TrackState,
}

impl PlacementTracker {
    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self {
            x: AdaptiveFilter::new(config.position),
            y: AdaptiveFilter::new(config.position),
            width: AdaptiveFilter::new(config.size),
            height: AdaptiveFilter::new(config.size),
            angle: AdaptiveFilter::angular(config.angle),
            fade_duration_ms: config.fade_duration_ms,
            last_seen_ms: None,
            last_smoothed: None,
            opacity: 0.0,
            state: TrackState::Empty,
        }
    }

    pub fn update(&mut self, candidate: Option<Placement>, timestamp_ms: f64) -> Option<SmoothedPlacement> {
        if let Some(raw) = candidate {
            // 長時間のブランク後に再検出された場合は古い平滑化状態を捨てる
            if self.is_expired(timestamp_ms) {
                self.reset();
            }
            let smoothed = Placement {
                x: self.x.filter(raw.x, timestamp_ms),
                y: self.y.filter(raw.y, timestamp_ms),
                width: self.width.filter(raw.width, timestamp_ms),
                height: self.height.filter(raw.height, timestamp_ms),
                angle: self.angle.filter(raw.angle, timestamp_ms),
            };
            if self.state != TrackState::Tracking {
                log::debug!("tracker: {:?} -> Tracking", self.state);
            }
            self.last_seen_ms = Some(timestamp_ms);
            self.last_smoothed = Some(smoothed);
            self.opacity = 1.0;
            self.state = TrackState::Tracking;
            return Some(SmoothedPlacement::new(smoothed, 1.0));
        }

        let (last, last_seen) = match (self.last_smoothed, self.last_seen_ms) {
            (Some(last), Some(last_seen)) => (last, last_seen),
            _ => return None,
        };

        let elapsed = timestamp_ms - last_seen;
        if elapsed >= self.fade_duration_ms {
            log::debug!("tracker: lost for {:.0} ms -> Empty", elapsed);
            self.reset();
            return None;
        }

        self.opacity = (1.0 - elapsed / self.fade_duration_ms).clamp(0.0, 1.0) as f32;
        self.state = TrackState::Fading;
        Some(SmoothedPlacement::new(last, self.opacity))
    }

    fn is_expired(&self, timestamp_ms: f64) -> bool {
        self.last_seen_ms
            .is_some_and(|last_seen| timestamp_ms - last_seen >= self.fade_duration_ms)
    }

    /// Clears all filters and drops the held placement.
    pub fn reset(&mut self) {
        for filter in [
            &mut self.x,
            &mut self.y,
            &mut self.width,
            &mut self.height,
            &mut self.angle,
        ] {
            filter.reset();
        }
        self.last_seen_ms = None;
        self.last_smoothed = None;
        self.opacity = 0.0;
        self.state = TrackState::Empty;
    }

    /// Last smoothed placement with its current opacity, without advancing
    /// the fade.
    pub fn snapshot(&self) -> Option<SmoothedPlacement> {
        match self.last_smoothed {
            Some(last) if self.opacity > 0.0 => Some(SmoothedPlacement::new(last, self.opacity)),
            _ => None,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn fade_duration_ms(&self) -> f64 {
        self.fade_duration_ms
    }
}
