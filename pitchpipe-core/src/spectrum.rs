//! # Spectrum Reduction Module
//!
//! Reduces a full magnitude spectrum to the handful of low-frequency
//! bins the bar display can actually show. Musical fundamentals live in
//! the low band, so the high bins are simply discarded.

/// Default number of bars in the display, the low 1/24th of a
/// 2048-point spectrum.
pub const DISPLAY_BIN_COUNT: usize = 2048 / 24;

/// Keeps the first `min(len, display_bin_count)` bins of a magnitude
/// spectrum, unchanged in value and order.
///
/// No smoothing or averaging across frames is applied; each frame's
/// bins stand alone.
pub fn reduce(magnitude_spectrum: &[f64], display_bin_count: usize) -> Vec<f64> {
    let keep = magnitude_spectrum.len().min(display_bin_count);
    magnitude_spectrum[..keep].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_spectrum_is_truncated_to_bin_count() {
        let spectrum: Vec<f64> = (0..1024).map(|i| i as f64 * 0.5).collect();
        let bins = reduce(&spectrum, DISPLAY_BIN_COUNT);

        assert_eq!(bins.len(), DISPLAY_BIN_COUNT);
        for (i, bin) in bins.iter().enumerate() {
            assert_eq!(
                *bin,
                spectrum[i],
                "bin {} must keep its original value and position",
                i
            );
        }
    }

    #[test]
    fn short_spectrum_passes_through_whole() {
        let spectrum = vec![1.0, 2.0, 3.0];
        let bins = reduce(&spectrum, DISPLAY_BIN_COUNT);
        assert_eq!(bins, spectrum);
    }

    #[test]
    fn empty_spectrum_yields_no_bins() {
        assert!(reduce(&[], DISPLAY_BIN_COUNT).is_empty());
    }
}
