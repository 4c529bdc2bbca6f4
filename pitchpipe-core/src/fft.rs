//! # Spectrum Analysis Module
//!
//! Computes the magnitude spectrum of one analysis frame for the bar
//! display. The FFT plan is created once and reused across frames.
//!
//! ## Processing steps
//! 1. DC offset removal
//! 2. Hann windowing against spectral leakage
//! 3. Forward FFT
//! 4. Magnitudes over the first half of the bins (Nyquist)

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Reusable FFT pipeline for fixed-size frames.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame_size: usize,
}

impl SpectrumAnalyzer {
    /// Plans an FFT for frames of `frame_size` samples and precomputes
    /// the Hann window.
    pub fn new(frame_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let window = (0..frame_size)
            .map(|i| {
                let x = i as f32 / (frame_size - 1) as f32;
                0.5 * (1.0 - (2.0 * PI * x).cos())
            })
            .collect();
        Self {
            fft,
            window,
            frame_size,
        }
    }

    /// Transforms one frame into its magnitude spectrum.
    ///
    /// # Panics
    /// * If `signal` is not exactly the planned frame size
    pub fn magnitudes(&self, signal: &[f32]) -> Vec<f64> {
        assert_eq!(
            signal.len(),
            self.frame_size,
            "frame length must match the planned FFT size"
        );

        let mean = signal.iter().sum::<f32>() / self.frame_size as f32;
        let mut buffer: Vec<Complex<f32>> = signal
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex {
                re: (sample - mean) * w,
                im: 0.0,
            })
            .collect();

        self.fft.process(&mut buffer);

        // Everything above Nyquist mirrors the lower half.
        buffer
            .iter()
            .take(self.frame_size / 2)
            .map(|c| c.norm() as f64)
            .collect()
    }
}
