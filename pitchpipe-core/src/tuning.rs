//! # Pitch Matching Module
//!
//! This module turns a raw fundamental-frequency estimate into a note
//! identification and a deviation score for the meter display.
//!
//! ## Features
//! - Nearest-note lookup against the catalog
//! - Signed, ratio-based deviation scoring
//! - Needle angle mapping with hard clamping

use crate::catalog::{Note, NoteCatalog};

/// The equal-temperament semitone frequency ratio, 2^(1/12).
pub fn semitone_ratio() -> f64 {
    2.0_f64.powf(1.0 / 12.0)
}

/// A matched note together with the observation that produced it.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The catalog note nearest to the observation.
    pub note: Note,
    /// The observed fundamental frequency in Hz.
    pub observed_frequency_hz: f64,
    /// Signed deviation score; negative is flat, positive is sharp.
    pub deviation: f64,
}

/// Finds the catalog note closest to a given frequency.
///
/// Searches the whole catalog for the note whose reference frequency has
/// the smallest absolute difference from the input. On an exact tie the
/// lower note wins, because `min_by` keeps the first minimal element and
/// the catalog is ordered by ascending frequency.
///
/// The caller is responsible for filtering out silent frames; `frequency_hz`
/// must be finite and non-negative.
///
/// # Arguments
/// * `frequency_hz` - Observed fundamental frequency in Hz
/// * `catalog` - Catalog to match against
///
/// # Returns
/// * The nearest note in the catalog
pub fn find_nearest_note<'a>(frequency_hz: f64, catalog: &'a NoteCatalog) -> &'a Note {
    catalog
        .all()
        .iter()
        .min_by(|a, b| {
            let diff_a = (a.reference_frequency_hz - frequency_hz).abs();
            let diff_b = (b.reference_frequency_hz - frequency_hz).abs();
            diff_a.partial_cmp(&diff_b).unwrap()
        })
        .expect("catalog is never empty")
}

/// Scores how far an observed frequency deviates from a reference.
///
/// This is a ratio-normalized approximation of cents, not true
/// logarithmic cents: a score of +1.0 means one semitone sharp, -1.0 one
/// semitone flat. The flat branch normalizes against the semitone below
/// the reference, which makes the formula asymmetric around zero. The
/// meter display depends on this exact shape, so it must not be replaced
/// with the symmetric `1200 * log2(f/ref)` form.
///
/// # Arguments
/// * `observed_hz` - Measured frequency in Hz
/// * `reference_hz` - Equal-tempered reference frequency in Hz
///
/// # Returns
/// * Signed deviation score (positive = sharp, negative = flat)
pub fn deviation_score(observed_hz: f64, reference_hz: f64) -> f64 {
    let r = semitone_ratio();
    if observed_hz < reference_hz {
        (observed_hz / (reference_hz / r) - 1.0) / (r - 1.0) - 1.0
    } else {
        (observed_hz / reference_hz - 1.0) / (r - 1.0)
    }
}

/// Maximum needle swing to either side, in degrees.
pub const NEEDLE_SWING_DEGREES: f64 = 45.0;

/// Maps a deviation score onto the meter's needle angle.
///
/// A deviation magnitude of 1.0 (one semitone) maps to the full swing;
/// anything beyond that is pinned at the end of the scale.
pub fn needle_angle(deviation: f64) -> f64 {
    (deviation * NEEDLE_SWING_DEGREES).clamp(-NEEDLE_SWING_DEGREES, NEEDLE_SWING_DEGREES)
}
