use crate::landmark::{FaceLandmark, HandLandmark, LandmarkSet, NormalizedPoint, PoseLandmark};

use super::AccessoryKind;

/// Anchor landmarks of one accessory, still in normalized video space.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchors {
    /// Start of the scale bone; also the origin of the rotation vector.
    pub scale_from: NormalizedPoint,
    /// End of the scale bone.
    pub scale_to: NormalizedPoint,
    /// Points averaged into the anchor position.
    pub centroid: Vec<NormalizedPoint>,
}

/// Picks the anchor landmarks for `kind` out of one detector landmark set.
///
/// Returns `None` when a mandatory anchor is absent, non-finite or less
/// visible than `min_visibility`.
pub fn extract_anchors(
    kind: AccessoryKind,
    landmarks: &LandmarkSet,
    min_visibility: f32,
) -> Option<Anchors> {
    match kind {
        AccessoryKind::Crown => pair(
            landmarks,
            FaceLandmark::LeftEye as usize,
            FaceLandmark::RightEye as usize,
            min_visibility,
        ),
        AccessoryKind::Medal => pair(
            landmarks,
            PoseLandmark::LeftShoulder as usize,
            PoseLandmark::RightShoulder as usize,
            min_visibility,
        ),
        AccessoryKind::Trophy => hand(landmarks, min_visibility),
    }
}

/// 左右ペア（目・肩）: 中点をアンカー、距離をスケールにする
fn pair(landmarks: &LandmarkSet, left: usize, right: usize, min_visibility: f32) -> Option<Anchors> {
    let left = *landmarks.usable(left, min_visibility)?;
    let right = *landmarks.usable(right, min_visibility)?;
    Some(Anchors {
        scale_from: left,
        scale_to: right,
        centroid: vec![left, right],
    })
}

/// 手首 + 使える指の付け根。手のひら中心は全点の平均
fn hand(landmarks: &LandmarkSet, min_visibility: f32) -> Option<Anchors> {
    let wrist = *landmarks.usable(HandLandmark::Wrist as usize, min_visibility)?;

    let scale_to = HandLandmark::SCALE_BONE_PREFERENCE
        .iter()
        .find_map(|&bone| landmarks.usable(bone as usize, min_visibility))
        .copied()?;

    let mut centroid = vec![wrist];
    centroid.extend(
        HandLandmark::FINGER_BASES
            .iter()
            .filter_map(|&base| landmarks.usable(base as usize, min_visibility))
            .copied(),
    );

    Some(Anchors {
        scale_from: wrist,
        scale_to,
        centroid,
    })
}
