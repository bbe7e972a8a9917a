use image::RgbaImage;

use crate::accessory::AccessoryKind;
use crate::config::{CaptureConfig, Config};
use crate::error::Result;
use crate::geometry::{capture_crop, DisplayGeometry, SourceRect};
use crate::pipeline::{AccessoryPipeline, LandmarkDetector, Tick};
use crate::render::{OverlayRenderer, MIN_VISIBLE_OPACITY};

/// 3つのアクセサリパイプラインと描画アセットをまとめたもの
///
/// Each pipeline owns its tracker; nothing is shared between accessories.
pub struct OverlaySession {
    pipelines: [AccessoryPipeline; 3],
    renderers: [Option<OverlayRenderer>; 3],
    capture: CaptureConfig,
}

impl OverlaySession {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pipelines: [
                AccessoryPipeline::from_config(&config.crown)?,
                AccessoryPipeline::from_config(&config.medal)?,
                AccessoryPipeline::from_config(&config.trophy)?,
            ],
            renderers: [None, None, None],
            capture: config.capture,
        })
    }

    /// Registers the image drawn for `kind` and locks the drawn aspect
    /// ratio to it.
    pub fn set_asset(&mut self, kind: AccessoryKind, image: RgbaImage) -> Result<()> {
        let renderer = OverlayRenderer::new(image)?;
        let (width, height) = renderer.image_size();
        let pipeline = &mut self.pipelines[kind.index()];
        let config = pipeline.config().with_image_size(width, height)?;
        pipeline.reconfigure(&config)?;
        self.renderers[kind.index()] = Some(renderer);
        Ok(())
    }

    pub fn pipeline(&self, kind: AccessoryKind) -> &AccessoryPipeline {
        &self.pipelines[kind.index()]
    }

    pub fn pipeline_mut(&mut self, kind: AccessoryKind) -> &mut AccessoryPipeline {
        &mut self.pipelines[kind.index()]
    }

    /// トグル操作。無効化するとトラッカーもリセットされる
    pub fn set_enabled(&mut self, kind: AccessoryKind, enabled: bool) {
        let pipeline = self.pipeline_mut(kind);
        if enabled {
            pipeline.start();
        } else {
            pipeline.stop();
        }
    }

    pub fn is_enabled(&self, kind: AccessoryKind) -> bool {
        self.pipeline(kind).is_running()
    }

    pub fn tick<D>(
        &mut self,
        kind: AccessoryKind,
        detector: &mut D,
        geometry: &DisplayGeometry,
        now_ms: f64,
    ) -> Tick
    where
        D: LandmarkDetector + ?Sized,
    {
        self.pipeline_mut(kind).tick(detector, geometry, now_ms)
    }

    /// Redraws the live layer for `kind` from the tracker's current state.
    /// Returns `false` when no asset is registered for it.
    pub fn render_layer(&self, kind: AccessoryKind, target: &mut RgbaImage) -> bool {
        let Some(renderer) = &self.renderers[kind.index()] else {
            return false;
        };
        let snapshot = self.pipeline(kind).snapshot();
        renderer.render(
            snapshot.as_ref().map(|s| &s.placement),
            snapshot.map_or(0.0, |s| s.opacity),
            target,
        );
        true
    }

    /// Source rectangle of the video frame for a still capture.
    pub fn capture_crop(&self, geometry: &DisplayGeometry) -> Result<SourceRect> {
        capture_crop(geometry, self.capture.padding_ratio)
    }

    /// Composites every visible accessory onto a captured frame.
    ///
    /// Placements live in display pixels, so they are rescaled from
    /// `display_width × display_height` to the capture's resolution.
    /// Returns how many accessories were drawn.
    pub fn compose_capture(
        &self,
        capture: &mut RgbaImage,
        display_width: f32,
        display_height: f32,
    ) -> Result<usize> {
        let mut drawn = 0;
        for kind in AccessoryKind::ALL {
            let pipeline = self.pipeline(kind);
            if !pipeline.is_running() {
                continue;
            }
            let (Some(renderer), Some(snapshot)) = (&self.renderers[kind.index()], pipeline.snapshot())
            else {
                continue;
            };
            if snapshot.opacity <= MIN_VISIBLE_OPACITY {
                continue;
            }
            renderer.render_scaled(
                &snapshot.placement,
                snapshot.opacity,
                display_width,
                display_height,
                capture,
            )?;
            drawn += 1;
        }
        log::debug!("capture: composited {} accessories", drawn);
        Ok(drawn)
    }
}
