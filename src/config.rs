use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::accessory::AccessoryKind;
use crate::error::OverlayError;
use crate::tracker::FilterParams;

pub const CROWN_SIZE_RATIO: f32 = 1.9;
pub const CROWN_Y_OFFSET_RATIO: f32 = -1.5;
pub const MEDAL_SIZE_RATIO: f32 = 0.9;
pub const MEDAL_Y_OFFSET_RATIO: f32 = 0.5;
pub const TROPHY_SIZE_RATIO: f32 = 5.0;
pub const TROPHY_Y_OFFSET_RATIO: f32 = -2.5;

pub const FACE_DETECTION_HZ: f32 = 15.0;
pub const POSE_DETECTION_HZ: f32 = 10.0;
pub const HAND_DETECTION_HZ: f32 = 10.0;

pub const DEFAULT_FADE_DURATION_MS: f64 = 200.0;
pub const DEFAULT_MIN_VISIBILITY: f32 = 0.5;
pub const DEFAULT_CAPTURE_PADDING_RATIO: f32 = 0.08;

/// What the vertical offset ratio is multiplied by.
///
/// Screen y grows downward, so a positive `y_offset_ratio` always moves the
/// anchor down and a negative one raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetBasis {
    /// 描画する画像の高さ
    Height,
    /// アンカー間距離（目の間隔・肩幅・手のサイズ）
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Rotate with the vector between the two scale anchors.
    FollowAnchors,
    /// Always draw upright.
    Upright,
}

/// 5チャンネルの平滑化とフェードアウトの設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingConfig {
    pub position: FilterParams,
    pub size: FilterParams,
    pub angle: FilterParams,
    pub fade_duration_ms: f64,
}

impl SmoothingConfig {
    /// Position and size share one tuning; the angle channel gets its own
    /// rotational tuning (0.1, 5.0), overridable per accessory.
    pub fn uniform(min_cutoff: f32, beta: f32) -> Self {
        Self {
            position: FilterParams::new(min_cutoff, beta),
            size: FilterParams::new(min_cutoff, beta),
            angle: FilterParams::new(0.1, 5.0),
            fade_duration_ms: DEFAULT_FADE_DURATION_MS,
        }
    }
}

/// Per-accessory tuning: anchor geometry, pacing and smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessoryConfig {
    pub kind: AccessoryKind,
    pub enabled: bool,
    pub size_ratio: f32,
    pub y_offset_ratio: f32,
    pub offset_basis: OffsetBasis,
    pub rotation: RotationPolicy,
    /// 検出ループの目標レート (Hz)
    pub detection_hz: f32,
    /// これ未満の可視度のアンカーは欠損扱い
    pub min_visibility: f32,
    /// 画像のアスペクト比 (高さ / 幅)
    pub image_aspect: f32,
    pub smoothing: SmoothingConfig,
}

impl AccessoryConfig {
    pub fn for_kind(kind: AccessoryKind) -> Self {
        match kind {
            AccessoryKind::Crown => Self::crown(),
            AccessoryKind::Medal => Self::medal(),
            AccessoryKind::Trophy => Self::trophy(),
        }
    }

    pub fn crown() -> Self {
        Self {
            kind: AccessoryKind::Crown,
            enabled: true,
            size_ratio: CROWN_SIZE_RATIO,
            y_offset_ratio: CROWN_Y_OFFSET_RATIO,
            offset_basis: OffsetBasis::Height,
            rotation: RotationPolicy::FollowAnchors,
            detection_hz: FACE_DETECTION_HZ,
            min_visibility: DEFAULT_MIN_VISIBILITY,
            image_aspect: 1.0,
            smoothing: SmoothingConfig::uniform(0.05, 5.0),
        }
    }

    pub fn medal() -> Self {
        Self {
            kind: AccessoryKind::Medal,
            enabled: true,
            size_ratio: MEDAL_SIZE_RATIO,
            y_offset_ratio: MEDAL_Y_OFFSET_RATIO,
            offset_basis: OffsetBasis::Scale,
            rotation: RotationPolicy::FollowAnchors,
            detection_hz: POSE_DETECTION_HZ,
            min_visibility: DEFAULT_MIN_VISIBILITY,
            image_aspect: 1.0,
            smoothing: SmoothingConfig::uniform(0.1, 2.0),
        }
    }

    pub fn trophy() -> Self {
        Self {
            kind: AccessoryKind::Trophy,
            enabled: true,
            size_ratio: TROPHY_SIZE_RATIO,
            y_offset_ratio: TROPHY_Y_OFFSET_RATIO,
            offset_basis: OffsetBasis::Scale,
            rotation: RotationPolicy::Upright,
            detection_hz: HAND_DETECTION_HZ,
            min_visibility: DEFAULT_MIN_VISIBILITY,
            image_aspect: 1.0,
            smoothing: SmoothingConfig::uniform(0.5, 10.0),
        }
    }

    /// Locks the drawn height to the asset's aspect ratio.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Result<Self, OverlayError> {
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidImage { width, height });
        }
        self.image_aspect = height as f32 / width as f32;
        Ok(self)
    }

    /// 検出ループの間隔 (ms)
    pub fn detection_interval_ms(&self) -> f64 {
        1000.0 / self.detection_hz as f64
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        let name = self.kind.name();
        let positive = |value: f32, field: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(OverlayError::InvalidConfig(format!(
                    "{}.{} must be positive, got {}",
                    name, field, value
                )))
            }
        };
        positive(self.size_ratio, "size_ratio")?;
        positive(self.detection_hz, "detection_hz")?;
        positive(self.image_aspect, "image_aspect")?;
        if !self.y_offset_ratio.is_finite() {
            return Err(OverlayError::InvalidConfig(format!(
                "{}.y_offset_ratio must be finite",
                name
            )));
        }
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(OverlayError::InvalidConfig(format!(
                "{}.min_visibility must be within 0..=1, got {}",
                name, self.min_visibility
            )));
        }
        if !(self.smoothing.fade_duration_ms.is_finite() && self.smoothing.fade_duration_ms > 0.0) {
            return Err(OverlayError::InvalidConfig(format!(
                "{}.fade_duration_ms must be positive",
                name
            )));
        }
        for (channel, params) in [
            ("position", self.smoothing.position),
            ("size", self.smoothing.size),
            ("angle", self.smoothing.angle),
        ] {
            positive(params.min_cutoff, &format!("{}.min_cutoff", channel))?;
            positive(params.d_cutoff, &format!("{}.d_cutoff", channel))?;
            if !(params.beta.is_finite() && params.beta >= 0.0) {
                return Err(OverlayError::InvalidConfig(format!(
                    "{}.{}.beta must be non-negative",
                    name, channel
                )));
            }
        }
        Ok(())
    }
}

/// TOMLの各アクセサリセクション。指定されたフィールドだけ既定値を上書きする
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccessorySection {
    enabled: Option<bool>,
    size_ratio: Option<f32>,
    y_offset_ratio: Option<f32>,
    offset_basis: Option<OffsetBasis>,
    rotation: Option<RotationPolicy>,
    detection_hz: Option<f32>,
    min_visibility: Option<f32>,
    image_aspect: Option<f32>,
    fade_duration_ms: Option<f64>,
    position: Option<FilterParams>,
    size: Option<FilterParams>,
    angle: Option<FilterParams>,
}

impl AccessorySection {
    fn apply(self, mut base: AccessoryConfig) -> AccessoryConfig {
        if let Some(v) = self.enabled { base.enabled = v; }
        if let Some(v) = self.size_ratio { base.size_ratio = v; }
        if let Some(v) = self.y_offset_ratio { base.y_offset_ratio = v; }
        if let Some(v) = self.offset_basis { base.offset_basis = v; }
        if let Some(v) = self.rotation { base.rotation = v; }
        if let Some(v) = self.detection_hz { base.detection_hz = v; }
        if let Some(v) = self.min_visibility { base.min_visibility = v; }
        if let Some(v) = self.image_aspect { base.image_aspect = v; }
        if let Some(v) = self.fade_duration_ms { base.smoothing.fade_duration_ms = v; }
        if let Some(v) = self.position { base.smoothing.position = v; }
        if let Some(v) = self.size { base.smoothing.size = v; }
        if let Some(v) = self.angle { base.smoothing.angle = v; }
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CaptureConfig {
    /// 静止画キャプチャでクロップ方向に広げる割合
    #[serde(default = "default_padding_ratio")]
    pub padding_ratio: f32,
}

fn default_padding_ratio() -> f32 { DEFAULT_CAPTURE_PADDING_RATIO }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            padding_ratio: default_padding_ratio(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    crown: AccessorySection,
    #[serde(default)]
    medal: AccessorySection,
    #[serde(default)]
    trophy: AccessorySection,
    #[serde(default)]
    capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub crown: AccessoryConfig,
    pub medal: AccessoryConfig,
    pub trophy: AccessoryConfig,
    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crown: AccessoryConfig::crown(),
            medal: AccessoryConfig::medal(),
            trophy: AccessoryConfig::trophy(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Falls back to defaults when the file is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = Self {
            crown: raw.crown.apply(AccessoryConfig::crown()),
            medal: raw.medal.apply(AccessoryConfig::medal()),
            trophy: raw.trophy.apply(AccessoryConfig::trophy()),
            capture: raw.capture,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        for kind in AccessoryKind::ALL {
            self.accessory(kind).validate()?;
        }
        if !(self.capture.padding_ratio.is_finite() && self.capture.padding_ratio >= 0.0) {
            return Err(OverlayError::InvalidConfig(
                "capture.padding_ratio must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn accessory(&self, kind: AccessoryKind) -> &AccessoryConfig {
        match kind {
            AccessoryKind::Crown => &self.crown,
            AccessoryKind::Medal => &self.medal,
            AccessoryKind::Trophy => &self.trophy,
        }
    }

    pub fn accessory_mut(&mut self, kind: AccessoryKind) -> &mut AccessoryConfig {
        match kind {
            AccessoryKind::Crown => &mut self.crown,
            AccessoryKind::Medal => &mut self.medal,
            AccessoryKind::Trophy => &mut self.trophy,
        }
    }
}
