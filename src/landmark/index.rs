/// Face mesh landmark indices used for the crown (468-point mesh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FaceLandmark {
    LeftEye = 33,
    RightEye = 263,
}

impl FaceLandmark {
    pub const COUNT: usize = 468;
}

/// 33点ポーズモデルのインデックス（メダル用に肩のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    LeftShoulder = 11,
    RightShoulder = 12,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;
}

/// 21点ハンドモデルのインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    /// 人差し指 MCP
    IndexBase = 5,
    /// 中指 MCP
    MiddleBase = 9,
    /// 薬指 MCP
    RingBase = 13,
    /// 小指 MCP
    PinkyBase = 17,
}

impl HandLandmark {
    pub const COUNT: usize = 21;

    /// Finger bases in the order they are preferred as the hand scale bone.
    pub const SCALE_BONE_PREFERENCE: [HandLandmark; 4] = [
        HandLandmark::MiddleBase,
        HandLandmark::IndexBase,
        HandLandmark::RingBase,
        HandLandmark::PinkyBase,
    ];

    /// Finger bases averaged into the palm centroid, in index order.
    pub const FINGER_BASES: [HandLandmark; 4] = [
        HandLandmark::IndexBase,
        HandLandmark::MiddleBase,
        HandLandmark::RingBase,
        HandLandmark::PinkyBase,
    ];
}
