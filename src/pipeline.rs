use crate::accessory::{AccessoryKind, AccessoryResolver};
use crate::config::AccessoryConfig;
use crate::error::{OverlayError, Result};
use crate::geometry::DisplayGeometry;
use crate::landmark::LandmarkSet;
use crate::placement::SmoothedPlacement;
use crate::tracker::PlacementTracker;

/// ランドマーク検出器。外部のMLランタイムをラップする
///
/// Returns one landmark set per detected person; an empty vector means
/// nothing was found. Errors are reported but never abort the loop.
pub trait LandmarkDetector {
    fn detect(&mut self, timestamp_ms: f64) -> anyhow::Result<Vec<LandmarkSet>>;
}

impl<F> LandmarkDetector for F
where
    F: FnMut(f64) -> anyhow::Result<Vec<LandmarkSet>>,
{
    fn detect(&mut self, timestamp_ms: f64) -> anyhow::Result<Vec<LandmarkSet>> {
        self(timestamp_ms)
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// 停止中、または次の検出時刻に達していない
    Idle,
    /// ジオメトリが不正。このフレームは描画しない
    Skipped,
    /// Tracker output for this frame; `None` means nothing to draw.
    Frame(Option<SmoothedPlacement>),
}

/// Detect → resolve → smooth loop for one accessory, paced at the
/// accessory's own detection rate.
pub struct AccessoryPipeline {
    resolver: AccessoryResolver,
    tracker: PlacementTracker,
    interval_ms: f64,
    last_run_ms: Option<f64>,
    running: bool,
}

impl AccessoryPipeline {
    pub fn from_config(config: &AccessoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver: AccessoryResolver::from_config(config),
            tracker: PlacementTracker::from_config(&config.smoothing),
            interval_ms: config.detection_interval_ms(),
            last_run_ms: None,
            running: config.enabled,
        })
    }

    pub fn kind(&self) -> AccessoryKind {
        self.resolver.config().kind
    }

    pub fn config(&self) -> &AccessoryConfig {
        self.resolver.config()
    }

    /// Swaps in a new configuration. Smoothing restarts from scratch.
    pub fn reconfigure(&mut self, config: &AccessoryConfig) -> Result<()> {
        if config.kind != self.kind() {
            return Err(OverlayError::InvalidConfig(format!(
                "cannot reconfigure {} pipeline as {}",
                self.kind(),
                config.kind
            )));
        }
        let running = self.running;
        *self = Self::from_config(config)?;
        self.running = running;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("{}: start", self.kind());
        }
        self.running = true;
        self.last_run_ms = None;
    }

    /// Stops the loop and drops all smoothing state, so a later start
    /// does not resume with stale momentum.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("{}: stop", self.kind());
        }
        self.running = false;
        self.last_run_ms = None;
        self.tracker.reset();
    }

    /// 前回の検出から間隔が経過したか
    pub fn is_due(&self, now_ms: f64) -> bool {
        match self.last_run_ms {
            Some(last) => now_ms - last >= self.interval_ms,
            None => true,
        }
    }

    /// Runs the detector if the pipeline is running and due.
    pub fn tick<D>(&mut self, detector: &mut D, geometry: &DisplayGeometry, now_ms: f64) -> Tick
    where
        D: LandmarkDetector + ?Sized,
    {
        if !self.running || !self.is_due(now_ms) {
            return Tick::Idle;
        }
        self.last_run_ms = Some(now_ms);

        let detections = match detector.detect(now_ms) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("{}: detector failed: {:#}", self.kind(), e);
                Vec::new()
            }
        };
        // 最初の1人だけを使う
        self.process(detections.first(), geometry, now_ms)
    }

    /// Feeds one frame's landmarks (or their absence) through the resolver
    /// and tracker, ignoring pacing.
    pub fn process(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        geometry: &DisplayGeometry,
        now_ms: f64,
    ) -> Tick {
        let candidate = match landmarks {
            Some(landmarks) => match self.resolver.compute(landmarks, geometry) {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::warn!("{}: skipping frame: {}", self.kind(), e);
                    return Tick::Skipped;
                }
            },
            None => None,
        };
        Tick::Frame(self.tracker.update(candidate, now_ms))
    }

    /// Current smoothed placement without advancing the fade.
    pub fn snapshot(&self) -> Option<SmoothedPlacement> {
        self.tracker.snapshot()
    }

    pub fn tracker(&self) -> &PlacementTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{FaceLandmark, NormalizedPoint};
    use crate::tracker::TrackState;

    fn geometry() -> DisplayGeometry {
        DisplayGeometry::new(1000.0, 1000.0, 1000.0, 1000.0)
    }

    fn face() -> LandmarkSet {
        LandmarkSet::sparse(
            FaceLandmark::COUNT,
            &[
                (FaceLandmark::LeftEye as usize, NormalizedPoint::new(0.4, 0.4)),
                (FaceLandmark::RightEye as usize, NormalizedPoint::new(0.6, 0.4)),
            ],
        )
    }

    fn crown() -> AccessoryPipeline {
        AccessoryPipeline::from_config(&AccessoryConfig::crown()).unwrap()
    }

    #[test]
    fn test_paced_at_detection_rate() {
        let mut pipeline = crown();
        let mut calls = 0;
        let mut detector = |_: f64| -> anyhow::Result<Vec<LandmarkSet>> {
            calls += 1;
            Ok(vec![face()])
        };
        // 15 Hz → 66.7 ms
        assert!(matches!(pipeline.tick(&mut detector, &geometry(), 0.0), Tick::Frame(Some(_))));
        assert_eq!(pipeline.tick(&mut detector, &geometry(), 30.0), Tick::Idle);
        assert_eq!(pipeline.tick(&mut detector, &geometry(), 60.0), Tick::Idle);
        assert!(matches!(pipeline.tick(&mut detector, &geometry(), 70.0), Tick::Frame(Some(_))));
        drop(detector);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_detector_error_counts_as_no_detection() {
        let mut pipeline = crown();
        let mut ok = |_: f64| -> anyhow::Result<Vec<LandmarkSet>> { Ok(vec![face()]) };
        pipeline.tick(&mut ok, &geometry(), 0.0);

        let mut failing = |_: f64| -> anyhow::Result<Vec<LandmarkSet>> { anyhow::bail!("model crashed") };
        match pipeline.tick(&mut failing, &geometry(), 100.0) {
            Tick::Frame(Some(out)) => assert!((out.opacity - 0.5).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(pipeline.tracker().state(), TrackState::Fading);
    }

    #[test]
    fn test_invalid_geometry_skips_frame() {
        let mut pipeline = crown();
        pipeline.process(Some(&face()), &geometry(), 0.0);
        let bad = DisplayGeometry::new(0.0, 1000.0, 1000.0, 1000.0);
        assert_eq!(pipeline.process(Some(&face()), &bad, 50.0), Tick::Skipped);
        // tracker untouched
        assert_eq!(pipeline.tracker().state(), TrackState::Tracking);
        assert_eq!(pipeline.snapshot().unwrap().opacity, 1.0);
    }

    #[test]
    fn test_stop_resets_tracker() {
        let mut pipeline = crown();
        pipeline.process(Some(&face()), &geometry(), 0.0);
        pipeline.stop();
        assert!(!pipeline.is_running());
        assert!(pipeline.snapshot().is_none());

        let mut detector = |_: f64| -> anyhow::Result<Vec<LandmarkSet>> { Ok(vec![face()]) };
        assert_eq!(pipeline.tick(&mut detector, &geometry(), 10.0), Tick::Idle);

        pipeline.start();
        assert!(matches!(pipeline.tick(&mut detector, &geometry(), 20.0), Tick::Frame(Some(_))));
    }

    #[test]
    fn test_disabled_config_starts_stopped() {
        let mut config = AccessoryConfig::medal();
        config.enabled = false;
        let pipeline = AccessoryPipeline::from_config(&config).unwrap();
        assert!(!pipeline.is_running());
    }

    #[test]
    fn test_reconfigure_rejects_other_kind() {
        let mut pipeline = crown();
        assert!(pipeline.reconfigure(&AccessoryConfig::medal()).is_err());
        let resized = AccessoryConfig::crown().with_image_size(100, 50).unwrap();
        pipeline.reconfigure(&resized).unwrap();
        assert_eq!(pipeline.config().image_aspect, 0.5);
    }
}
