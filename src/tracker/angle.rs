use std::f32::consts::{PI, TAU};

/// Wraps an angle in radians into `[-π, π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed shortest rotation from `from` to `to`, in `[-π, π)`.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}
