//! # Acceptance Filter Module
//!
//! Debounces the per-frame note stream coming out of the matcher. A
//! single noisy frame must not flip the displayed note, so a note is
//! only accepted once the detector reports it on two consecutive frames.

/// Debounce state. `Pending` holds a note seen exactly once; `Accepted`
/// holds the note currently confirmed for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterState {
    /// No prior observation.
    Idle,
    /// Last frame matched this note id, awaiting confirmation.
    Pending(String),
    /// This note id is confirmed and currently displayed.
    Accepted(String),
}

/// The debounce/hysteresis state machine.
///
/// Transitions on each observed note id:
/// - `Idle` -> `Pending(id)`, no acceptance.
/// - `Pending(p)` with the same id -> `Accepted(id)`, accepted.
/// - `Pending(p)` with a different id -> `Pending(id)`; the mismatch
///   restarts the pending window rather than resetting to `Idle`.
/// - `Accepted(a)` with the same id -> stays accepted and reports the
///   acceptance again, so the deviation readout refreshes every frame.
/// - `Accepted(a)` with a different id -> `Pending(id)`; the previously
///   accepted note keeps displaying until the new one is re-confirmed.
///
/// Silent frames never reach the filter; the caller simply does not
/// invoke `observe`, which leaves the previous accepted note on screen.
#[derive(Debug)]
pub struct AcceptanceFilter {
    state: FilterState,
}

impl AcceptanceFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::Idle,
        }
    }

    /// Feeds one frame's matched note id into the machine.
    ///
    /// # Returns
    /// * `true` - The note is accepted for display this frame
    /// * `false` - No acceptance; keep displaying whatever was shown
    pub fn observe(&mut self, note_id: &str) -> bool {
        match &self.state {
            FilterState::Idle => {
                self.state = FilterState::Pending(note_id.to_string());
                false
            }
            FilterState::Pending(pending) if pending == note_id => {
                self.state = FilterState::Accepted(note_id.to_string());
                true
            }
            FilterState::Pending(_) => {
                self.state = FilterState::Pending(note_id.to_string());
                false
            }
            FilterState::Accepted(accepted) if accepted == note_id => true,
            FilterState::Accepted(_) => {
                self.state = FilterState::Pending(note_id.to_string());
                false
            }
        }
    }

    /// Returns the machine to `Idle`, forgetting any pending or accepted
    /// note. Used when auto mode is toggled.
    pub fn reset(&mut self) {
        self.state = FilterState::Idle;
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::new()
    }
}
