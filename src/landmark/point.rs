use serde::{Deserialize, Serialize};

/// 検出器が返す単一ランドマーク（ソース映像の正規化座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 可視度 (0.0〜1.0)。ポーズ検出器のみが出力する
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// 可視度が閾値以上か。可視度が無い点は完全に見えているとみなす
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility.unwrap_or(1.0) >= threshold
    }

    /// 座標が有限値か
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 1人分のランドマーク列。インデックスは検出器ごとのスキーマに従う
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<NormalizedPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self { points }
    }

    /// インデックスでランドマークを取得。範囲外なら None
    pub fn get(&self, index: usize) -> Option<&NormalizedPoint> {
        self.points.get(index)
    }

    /// Returns the landmark only if it is present, finite and visible enough.
    pub fn usable(&self, index: usize, min_visibility: f32) -> Option<&NormalizedPoint> {
        self.get(index)
            .filter(|p| p.is_finite() && p.is_visible(min_visibility))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Builds a set of `len` default points with the given entries filled in.
    pub fn sparse(len: usize, entries: &[(usize, NormalizedPoint)]) -> Self {
        let mut points = vec![NormalizedPoint::new(0.0, 0.0); len];
        for &(index, point) in entries {
            if index < len {
                points[index] = point;
            }
        }
        Self { points }
    }
}

impl From<Vec<NormalizedPoint>> for LandmarkSet {
    fn from(points: Vec<NormalizedPoint>) -> Self {
        Self::new(points)
    }
}
