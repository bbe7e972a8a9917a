use serde::{Deserialize, Serialize};

use super::angle::{shortest_angle_delta, wrap_angle};

/// Sampling rate assumed until two timestamps have been seen.
pub const DEFAULT_RATE_HZ: f32 = 30.0;

/// One Euro Filter のパラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// 静止時のカットオフ周波数 (Hz)
    pub min_cutoff: f32,
    /// 速度に対するカットオフの増加率
    pub beta: f32,
    /// 微分値のカットオフ周波数 (Hz)
    #[serde(default = "default_d_cutoff")]
    pub d_cutoff: f32,
}

fn default_d_cutoff() -> f32 { 1.0 }

impl FilterParams {
    pub fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff: default_d_cutoff(),
        }
    }
}

/// Whether a channel is a plain scalar or an angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Linear,
    Angular,
}

/// Low-pass filter component
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { prev: None }
    }

    fn seed(&mut self, value: f32) {
        self.prev = Some(value);
    }

    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        match self.prev {
            Some(prev) => {
                let result = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(result);
                result
            }
            None => {
                self.prev = Some(value);
                value
            }
        }
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// Snapshot of a filter's internal state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub value: Option<f32>,
    pub derivative: Option<f32>,
    pub last_timestamp: Option<f64>,
}

/// Velocity-aware low-pass filter for one scalar channel (One Euro Filter).
///
/// The cutoff rises with the filtered rate of change, so the output follows
/// fast motion closely and holds still when the input only jitters. The
/// sampling rate is re-estimated from consecutive timestamps.
pub struct AdaptiveFilter {
    params: FilterParams,
    channel: Channel,
    rate: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    last_timestamp: Option<f64>,
}

impl AdaptiveFilter {
    pub fn new(params: FilterParams) -> Self {
        Self::with_channel(params, Channel::Linear)
    }

    pub fn angular(params: FilterParams) -> Self {
        Self::with_channel(params, Channel::Angular)
    }

    pub fn with_channel(params: FilterParams, channel: Channel) -> Self {
        Self {
            params,
            channel,
            rate: DEFAULT_RATE_HZ,
            x_filter: LowPassFilter::new(),
            dx_filter: LowPassFilter::new(),
            last_timestamp: None,
        }
    }

    pub fn filter(&mut self, raw: f32, timestamp_ms: f64) -> f32 {
        if let Some(last) = self.last_timestamp {
            let dt = timestamp_ms - last;
            // 同一タイムスタンプでは前回のレートを維持
            if dt > 0.0 {
                self.rate = (1000.0 / dt) as f32;
            }
        }
        self.last_timestamp = Some(timestamp_ms);

        let prev = match self.x_filter.prev {
            Some(prev) => prev,
            None => {
                let first = match self.channel {
                    Channel::Linear => raw,
                    Channel::Angular => wrap_angle(raw),
                };
                self.x_filter.seed(first);
                self.dx_filter.seed(0.0);
                return first;
            }
        };

        // Angles are unwrapped next to the previous value before blending.
        let target = match self.channel {
            Channel::Linear => raw,
            Channel::Angular => prev + shortest_angle_delta(prev, raw),
        };

        let te = 1.0 / self.rate;
        let dx = (target - prev) * self.rate;
        let edx = self
            .dx_filter
            .filter(dx, smoothing_factor(te, self.params.d_cutoff));
        let cutoff = self.params.min_cutoff + self.params.beta * edx.abs();
        let value = self.x_filter.filter(target, smoothing_factor(te, cutoff));

        match self.channel {
            Channel::Linear => value,
            Channel::Angular => {
                let wrapped = wrap_angle(value);
                self.x_filter.seed(wrapped);
                wrapped
            }
        }
    }

    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.last_timestamp = None;
        self.rate = DEFAULT_RATE_HZ;
    }

    pub fn state(&self) -> FilterState {
        FilterState {
            value: self.x_filter.prev,
            derivative: self.dx_filter.prev,
            last_timestamp: self.last_timestamp,
        }
    }

    /// Current estimate of the sampling rate in Hz.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn params(&self) -> FilterParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const FRAME_MS: f64 = 33.0;

    #[test]
    fn test_smoothing_factor_bounds() {
        // alpha should be between 0 and 1
        for &cutoff in &[0.1, 1.0, 10.0, 100.0] {
            for &te in &[0.001, 0.01, 0.033, 0.1] {
                let alpha = smoothing_factor(te, cutoff);
                assert!(alpha > 0.0 && alpha < 1.0, "alpha={} for te={}, cutoff={}", alpha, te, cutoff);
            }
        }
    }

    #[test]
    fn test_smoothing_factor_matches_tau_form() {
        let (te, fc) = (1.0 / 30.0, 2.0);
        let tau = 1.0 / (2.0 * PI * fc);
        let expected = 1.0 / (1.0 + tau / te);
        assert!((smoothing_factor(te, fc) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_first_sample_passthrough() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        assert_eq!(f.filter(5.0, 0.0), 5.0);
        let state = f.state();
        assert_eq!(state.value, Some(5.0));
        assert_eq!(state.derivative, Some(0.0));
        assert_eq!(state.last_timestamp, Some(0.0));
    }

    #[test]
    fn test_smooths_step() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        f.filter(0.0, 0.0);
        let result = f.filter(10.0, FRAME_MS);
        // With min_cutoff=1.0, beta=0, the filter should smooth significantly
        assert!(result < 10.0, "Expected smoothing, got {}", result);
        assert!(result > 0.0, "Expected positive value, got {}", result);
    }

    #[test]
    fn test_constant_input_converges() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 0.5));
        f.filter(0.0, 0.0);
        let mut value = 0.0;
        for i in 1..=300 {
            value = f.filter(5.0, i as f64 * FRAME_MS);
        }
        assert!((value - 5.0).abs() < 1e-3, "did not converge: {}", value);
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let mut f = AdaptiveFilter::new(FilterParams::new(0.05, 5.0));
        for i in 0..10 {
            let out = f.filter(42.0, i as f64 * FRAME_MS);
            assert!((out - 42.0).abs() < 1e-4, "drifted: {}", out);
        }
    }

    #[test]
    fn test_duplicate_timestamp_keeps_previous_rate() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 1.0));
        f.filter(0.0, 100.0);
        f.filter(1.0, 150.0);
        assert!((f.rate() - 20.0).abs() < 1e-3);
        let result = f.filter(2.0, 150.0);
        assert!(result.is_finite());
        assert!((f.rate() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_duplicate_timestamp_before_any_interval() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 1.0));
        f.filter(0.0, 0.0);
        let result = f.filter(1.0, 0.0);
        assert!(result.is_finite());
        assert_eq!(f.rate(), DEFAULT_RATE_HZ);
    }

    #[test]
    fn test_longer_interval_tracks_closer() {
        let mut slow = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        let mut fast = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        slow.filter(0.0, 0.0);
        fast.filter(0.0, 0.0);
        let after_long_gap = slow.filter(10.0, 100.0);
        let after_short_gap = fast.filter(10.0, 10.0);
        assert!(after_long_gap > after_short_gap);
    }

    #[test]
    fn test_high_beta_responsive() {
        // High beta: fast movements should pass through with less filtering
        let mut f_low_beta = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        let mut f_high_beta = AdaptiveFilter::new(FilterParams::new(1.0, 1.0));

        f_low_beta.filter(0.0, 0.0);
        f_high_beta.filter(0.0, 0.0);

        let r_low = f_low_beta.filter(10.0, FRAME_MS);
        let r_high = f_high_beta.filter(10.0, FRAME_MS);

        // High beta should be closer to the target (less lag)
        assert!(r_high > r_low, "High beta ({}) should be more responsive than low beta ({})", r_high, r_low);
    }

    #[test]
    fn test_angle_crosses_wrap_boundary_smoothly() {
        let mut f = AdaptiveFilter::angular(FilterParams::new(0.1, 5.0));
        f.filter(3.1, 0.0);
        let result = f.filter(-3.1, FRAME_MS);
        // stays near ±π instead of swinging through zero
        assert!(result.abs() > 3.0, "angle jumped through zero: {}", result);
        assert!(shortest_angle_delta(3.1, result).abs() < 0.1);
    }

    #[test]
    fn test_angle_output_stays_wrapped() {
        let mut f = AdaptiveFilter::angular(FilterParams::new(1.0, 1.0));
        let mut angle = 0.0f32;
        for i in 0..100 {
            angle += 0.3;
            let out = f.filter(wrap_angle(angle), i as f64 * FRAME_MS);
            assert!((-PI..PI).contains(&out), "out of range: {}", out);
        }
    }

    #[test]
    fn test_angle_converges_near_boundary() {
        let mut f = AdaptiveFilter::angular(FilterParams::new(1.0, 0.0));
        f.filter(3.0, 0.0);
        let mut out = 0.0;
        for i in 1..=300 {
            out = f.filter(-3.0, i as f64 * FRAME_MS);
        }
        assert!(shortest_angle_delta(-3.0, out).abs() < 1e-3, "out = {}", out);
    }

    #[test]
    fn test_reset() {
        let mut f = AdaptiveFilter::new(FilterParams::new(1.0, 0.0));
        f.filter(1.0, 0.0);
        f.filter(2.0, 10.0);
        f.reset();
        assert_eq!(f.state().value, None);
        assert_eq!(f.state().last_timestamp, None);
        // After reset, first frame should pass through
        assert_eq!(f.filter(10.0, 20.0), 10.0);
        assert_eq!(f.rate(), DEFAULT_RATE_HZ);
    }
}
