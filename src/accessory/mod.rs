pub mod anchors;
pub mod resolver;

use serde::Serialize;

pub use anchors::{extract_anchors, Anchors};
pub use resolver::AccessoryResolver;

/// Overlay asset kinds, one per landmark detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessoryKind {
    /// 王冠: 顔ランドマーク（両目）
    Crown,
    /// メダル: ポーズランドマーク（両肩）
    Medal,
    /// トロフィー: 手ランドマーク（手首と指の付け根）
    Trophy,
}

impl AccessoryKind {
    pub const ALL: [AccessoryKind; 3] = [
        AccessoryKind::Crown,
        AccessoryKind::Medal,
        AccessoryKind::Trophy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AccessoryKind::Crown => "crown",
            AccessoryKind::Medal => "medal",
            AccessoryKind::Trophy => "trophy",
        }
    }

    pub fn index(self) -> usize {
        match self {
            AccessoryKind::Crown => 0,
            AccessoryKind::Medal => 1,
            AccessoryKind::Trophy => 2,
        }
    }
}

impl std::fmt::Display for AccessoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
