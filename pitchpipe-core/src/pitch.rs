//! # Fundamental Frequency Estimation Module
//!
//! A YIN-based estimator for the dominant pitch of one analysis frame.
//! Robustness matters more than raw precision here: the engine's
//! acceptance filter handles frame-to-frame jitter, but the estimator
//! must refuse to report a pitch for silence or broadband noise.

/// Frames quieter than this RMS level are treated as silence.
pub const DEFAULT_AMPLITUDE_THRESHOLD: f32 = 0.01;

/// A candidate period dip must be at least this clear, or the frame is
/// rejected as noise.
const CLARITY_THRESHOLD: f32 = 0.1;

/// Lowest frequency the estimator will report, in Hz.
const MIN_FREQUENCY_HZ: f64 = 20.0;

/// YIN fundamental-frequency estimator with a reusable work buffer.
pub struct FundamentalEstimator {
    difference: Vec<f32>,
    amplitude_threshold: f32,
}

impl FundamentalEstimator {
    pub fn new(amplitude_threshold: f32) -> Self {
        Self {
            difference: Vec::new(),
            amplitude_threshold,
        }
    }

    /// Estimates the fundamental frequency of one frame.
    ///
    /// # Arguments
    /// * `signal` - Mono audio frame
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected fundamental in Hz
    /// * `None` - Silence, noise, or no clear periodicity
    pub fn estimate(&mut self, signal: &[f32], sample_rate: u32) -> Option<f64> {
        let half = signal.len() / 2;
        if half < 4 {
            return None;
        }

        // Silence gate.
        let rms =
            (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
        if rms < self.amplitude_threshold {
            return None;
        }

        // Squared difference function over candidate lags.
        self.difference.clear();
        self.difference.resize(half, 0.0);
        for tau in 1..half {
            let mut sum = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                sum += delta * delta;
            }
            self.difference[tau] = sum;
        }

        // Cumulative mean normalization, which flattens the spurious
        // minimum at lag zero.
        let mut running_sum = 0.0;
        self.difference[0] = 1.0;
        for tau in 1..half {
            running_sum += self.difference[tau];
            if running_sum > 0.0 {
                self.difference[tau] *= tau as f32 / running_sum;
            } else {
                self.difference[tau] = 1.0;
            }
        }

        let period = self.first_clear_dip(half)?;

        // Parabolic interpolation around the dip for sub-sample lag.
        if period + 1 >= half {
            return None;
        }
        let y1 = self.difference[period - 1];
        let y2 = self.difference[period];
        let y3 = self.difference[period + 1];
        let curvature = y1 - 2.0 * y2 + y3;
        let refined_period = if curvature != 0.0 {
            period as f32 + (y1 - y3) / (2.0 * curvature)
        } else {
            period as f32
        };

        let frequency = sample_rate as f64 / refined_period as f64;
        if frequency.is_finite() && frequency > MIN_FREQUENCY_HZ {
            Some(frequency)
        } else {
            None
        }
    }

    /// Finds the first local dip near the global minimum of the
    /// normalized difference. Taking the first such dip rather than the
    /// global minimum avoids reporting an octave too low.
    fn first_clear_dip(&self, half: usize) -> Option<usize> {
        let min_val = self.difference[1..half]
            .iter()
            .cloned()
            .fold(f32::INFINITY, f32::min);
        let threshold = min_val + 0.05;

        let period = (2..half).find(|&tau| {
            self.difference[tau] < threshold && self.difference[tau] < self.difference[tau - 1]
        })?;

        if self.difference[period] > CLARITY_THRESHOLD {
            return None;
        }
        Some(period)
    }
}

impl Default for FundamentalEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_AMPLITUDE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME: usize = 2048;

    fn sine(frequency: f32, amplitude: f32) -> Vec<f32> {
        (0..FRAME)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn detects_a_440_sine() {
        let mut estimator = FundamentalEstimator::default();
        let frequency = estimator
            .estimate(&sine(440.0, 0.5), SAMPLE_RATE)
            .expect("a clean 440 Hz tone must be detected");
        assert!(
            (frequency - 440.0).abs() < 5.0,
            "expected ~440 Hz, got {}",
            frequency
        );
    }

    #[test]
    fn detects_a_low_string() {
        let mut estimator = FundamentalEstimator::default();
        // E2, the low guitar string.
        let frequency = estimator
            .estimate(&sine(82.41, 0.5), SAMPLE_RATE)
            .expect("82 Hz is above the frame's resolution floor");
        assert!(
            (frequency - 82.41).abs() < 3.0,
            "expected ~82.4 Hz, got {}",
            frequency
        );
    }

    #[test]
    fn silence_yields_no_pitch() {
        let mut estimator = FundamentalEstimator::default();
        assert!(estimator.estimate(&vec![0.0; FRAME], SAMPLE_RATE).is_none());
        // Below the amplitude gate.
        assert!(
            estimator
                .estimate(&sine(440.0, 0.001), SAMPLE_RATE)
                .is_none()
        );
    }

    #[test]
    fn broadband_noise_yields_no_pitch() {
        let mut estimator = FundamentalEstimator::default();
        // Deterministic pseudo-noise, loud enough to pass the gate.
        let mut state = 0x12345678_u32;
        let noise: Vec<f32> = (0..FRAME)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 8) as f32 / (1 << 24) as f32 - 0.5
            })
            .collect();
        assert!(
            estimator.estimate(&noise, SAMPLE_RATE).is_none(),
            "noise should fail the clarity check"
        );
    }
}
