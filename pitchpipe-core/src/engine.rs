//! # Tuner Engine Module
//!
//! The per-frame orchestrator. Owns all mutable tuner state, runs the
//! matcher, deviation scorer and acceptance filter over each incoming
//! observation, and publishes events for the rendering layer over a
//! crossbeam channel.
//!
//! ## Concurrency contract
//! The engine is not internally synchronized. All calls - frame
//! delivery, mode toggles, manual selection and timer expiry - must
//! come from the single context that owns the engine, typically a
//! worker thread draining one command channel. The deferred manual
//! deselection is represented by a [`ManualToken`] so a timer firing
//! late can be recognized as stale and ignored.

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use std::time::Duration;

use crate::acceptance::AcceptanceFilter;
use crate::catalog::{Note, NoteCatalog};
use crate::tone::ReferenceTonePlayer;
use crate::tuning::{self, MatchResult};
use crate::{FrameObservation, ManualSelectionEvent, NoteEvent, SpectrumEvent, TunerEvent};
use crate::spectrum;

/// How long a manually selected note sounds before it deselects itself.
pub const MANUAL_TONE_DURATION: Duration = Duration::from_millis(2000);

/// Identifies one manual selection for deferred deselection.
///
/// `select_manual` hands out a fresh token each time; `expire_manual`
/// only acts when presented with the token of the *current* selection.
/// Any action that supersedes a selection invalidates the outstanding
/// token, so a sleeping timer can never clear a newer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualToken(u64);

/// The note-matching and feedback engine.
pub struct TunerEngine {
    catalog: NoteCatalog,
    display_bin_count: usize,
    events: Sender<TunerEvent>,
    tone: ReferenceTonePlayer,

    // Tuner state, only ever mutated by the owning context.
    auto_mode: bool,
    filter: AcceptanceFilter,
    accepted: Option<MatchResult>,
    spectrum_bins: Vec<f64>,
    manual_selection: Option<Note>,
    manual_generation: u64,
}

impl TunerEngine {
    /// Creates an engine publishing to the given event channel.
    ///
    /// # Arguments
    /// * `catalog` - Note table to match against
    /// * `display_bin_count` - Number of bins kept for the bar display
    /// * `tone` - Reference tone player for manual mode
    /// * `events` - Channel the rendering layer listens on
    pub fn new(
        catalog: NoteCatalog,
        display_bin_count: usize,
        tone: ReferenceTonePlayer,
        events: Sender<TunerEvent>,
    ) -> Self {
        Self {
            catalog,
            display_bin_count,
            events,
            tone,
            auto_mode: true,
            filter: AcceptanceFilter::new(),
            accepted: None,
            spectrum_bins: Vec::new(),
            manual_selection: None,
            manual_generation: 0,
        }
    }

    /// Processes one audio frame.
    ///
    /// The spectrum is reduced and published on every frame. Matching
    /// only runs in auto mode and only when the frame carries a usable
    /// frequency: absent, zero, negative or non-finite estimates are
    /// all treated as silence, which leaves the acceptance state (and
    /// whatever note is displayed) untouched.
    pub fn on_frame(&mut self, observation: &FrameObservation) {
        self.spectrum_bins =
            spectrum::reduce(&observation.magnitude_spectrum, self.display_bin_count);
        let _ = self.events.send(TunerEvent::Spectrum(SpectrumEvent {
            bins: self.spectrum_bins.clone(),
        }));

        let frequency = match observation.frequency_hz {
            Some(f) if f.is_finite() && f > 0.0 => f,
            _ => return,
        };
        if !self.auto_mode {
            return;
        }

        let note = tuning::find_nearest_note(frequency, &self.catalog).clone();
        let deviation = tuning::deviation_score(frequency, note.reference_frequency_hz);

        if self.filter.observe(&note.id) {
            let result = MatchResult {
                note,
                observed_frequency_hz: frequency,
                deviation,
            };
            let _ = self.events.send(TunerEvent::Note(NoteEvent {
                note_id: result.note.id.clone(),
                note_name: result.note.letter_name(),
                observed_frequency_hz: frequency,
                deviation,
                needle_angle_degrees: tuning::needle_angle(deviation),
            }));
            self.accepted = Some(result);
        }
    }

    /// Switches between automatic detection and manual selection.
    ///
    /// Leaving auto mode clears the accepted note and suspends the
    /// acceptance filter; re-entering resets the filter to idle and
    /// drops any manual selection, so only one of the two ever drives
    /// the needle.
    pub fn set_auto_mode(&mut self, enabled: bool) {
        if self.auto_mode == enabled {
            return;
        }
        self.auto_mode = enabled;
        self.filter.reset();
        if enabled {
            self.clear_manual_selection();
        } else {
            self.accepted = None;
        }
    }

    /// Selects a note by id in manual mode, sounding its reference tone.
    ///
    /// The returned token should be handed to a 2 s timer whose expiry
    /// calls [`expire_manual`](Self::expire_manual).
    ///
    /// # Errors
    /// * When auto mode is still enabled
    /// * When the id is not in the catalog
    pub fn select_manual(&mut self, note_id: &str) -> Result<ManualToken> {
        if self.auto_mode {
            return Err(anyhow!("manual selection requires auto mode to be off"));
        }
        let note = self
            .catalog
            .lookup(note_id)
            .ok_or_else(|| anyhow!("unknown note id: {}", note_id))?
            .clone();

        self.manual_generation += 1;
        let token = ManualToken(self.manual_generation);
        self.tone.start(note.reference_frequency_hz);
        let _ = self
            .events
            .send(TunerEvent::ManualSelection(ManualSelectionEvent {
                note_id: Some(note.id.clone()),
            }));
        self.manual_selection = Some(note);
        Ok(token)
    }

    /// Clears the manual selection and stops the tone.
    ///
    /// Also invalidates any outstanding deselection timer, so a timer
    /// armed for the old selection cannot fire into a newer one.
    pub fn deselect_manual(&mut self) {
        self.manual_generation += 1;
        self.clear_manual_selection();
    }

    /// Timer callback for the deferred deselection.
    ///
    /// Ignored unless the token still identifies the current selection.
    pub fn expire_manual(&mut self, token: ManualToken) {
        if token.0 == self.manual_generation && self.manual_selection.is_some() {
            self.manual_generation += 1;
            self.clear_manual_selection();
        }
    }

    fn clear_manual_selection(&mut self) {
        if self.manual_selection.take().is_some() {
            self.tone.stop();
            let _ = self
                .events
                .send(TunerEvent::ManualSelection(ManualSelectionEvent {
                    note_id: None,
                }));
        }
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// The currently confirmed, display-worthy match, if any.
    pub fn accepted_note(&self) -> Option<&MatchResult> {
        self.accepted.as_ref()
    }

    /// The most recent reduced spectrum.
    pub fn spectrum_bins(&self) -> &[f64] {
        &self.spectrum_bins
    }

    pub fn manual_selection(&self) -> Option<&Note> {
        self.manual_selection.as_ref()
    }

    pub fn catalog(&self) -> &NoteCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;

    fn test_engine() -> (TunerEngine, Receiver<TunerEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let engine = TunerEngine::new(
            NoteCatalog::standard(),
            spectrum::DISPLAY_BIN_COUNT,
            ReferenceTonePlayer::disabled(),
            tx,
        );
        (engine, rx)
    }

    fn frame(frequency_hz: Option<f64>) -> FrameObservation {
        FrameObservation {
            frequency_hz,
            magnitude_spectrum: vec![1.0; 1024],
        }
    }

    fn drain_note_events(rx: &Receiver<TunerEvent>) -> Vec<NoteEvent> {
        rx.try_iter()
            .filter_map(|e| match e {
                TunerEvent::Note(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn five_frame_scenario_emits_three_note_events() {
        let (mut engine, rx) = test_engine();

        // [441, 441, 523, 523, 523] maps to [A4, A4, C5, C5, C5].
        for f in [441.0, 441.0, 523.0, 523.0, 523.0] {
            engine.on_frame(&frame(Some(f)));
        }

        let notes = drain_note_events(&rx);
        let ids: Vec<&str> = notes.iter().map(|n| n.note_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["A4", "C5", "C5"],
            "expected Accepted(A4) after frame 2, Accepted(C5) after frames 4 and 5"
        );
        assert_eq!(engine.accepted_note().unwrap().note.id, "C5");
    }

    #[test]
    fn every_frame_emits_a_spectrum_event() {
        let (mut engine, rx) = test_engine();
        engine.on_frame(&frame(Some(441.0)));
        engine.on_frame(&frame(None));

        let spectra: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, TunerEvent::Spectrum(_)))
            .collect();
        assert_eq!(spectra.len(), 2, "silent frames still update the bars");
        assert_eq!(engine.spectrum_bins().len(), spectrum::DISPLAY_BIN_COUNT);
    }

    #[test]
    fn silence_leaves_the_accepted_note_displayed() {
        let (mut engine, rx) = test_engine();
        engine.on_frame(&frame(Some(441.0)));
        engine.on_frame(&frame(Some(441.0)));
        drain_note_events(&rx);

        engine.on_frame(&frame(None));
        engine.on_frame(&frame(Some(0.0)));

        assert!(drain_note_events(&rx).is_empty());
        assert_eq!(
            engine.accepted_note().unwrap().note.id,
            "A4",
            "silence must not clear the displayed note"
        );

        // Debounce state survives silence too: A4 is still accepted, so
        // the very next A4 frame re-emits.
        engine.on_frame(&frame(Some(441.0)));
        assert_eq!(drain_note_events(&rx).len(), 1);
    }

    #[test]
    fn invalid_observations_are_treated_as_silence() {
        let (mut engine, rx) = test_engine();
        engine.on_frame(&frame(Some(441.0)));
        for bad in [f64::NAN, f64::INFINITY, -100.0] {
            engine.on_frame(&frame(Some(bad)));
        }
        // A pending A4 plus three ignored frames: the next A4 confirms.
        engine.on_frame(&frame(Some(441.0)));
        assert_eq!(drain_note_events(&rx).len(), 1);
    }

    #[test]
    fn note_event_carries_needle_angle() {
        let (mut engine, rx) = test_engine();
        engine.on_frame(&frame(Some(441.0)));
        engine.on_frame(&frame(Some(441.0)));

        let note = &drain_note_events(&rx)[0];
        assert_eq!(note.note_id, "A4");
        assert!(note.deviation > 0.0, "441 Hz is sharp of A4");
        let expected = tuning::needle_angle(note.deviation);
        assert_eq!(note.needle_angle_degrees, expected);
        assert!(note.needle_angle_degrees.abs() <= 45.0);
    }

    #[test]
    fn manual_mode_suppresses_frame_driven_acceptance() {
        let (mut engine, rx) = test_engine();
        engine.set_auto_mode(false);

        for _ in 0..4 {
            engine.on_frame(&frame(Some(441.0)));
        }
        assert!(
            drain_note_events(&rx).is_empty(),
            "frames must never accept notes while auto mode is off"
        );
        assert!(engine.accepted_note().is_none());
    }

    #[test]
    fn disabling_auto_mode_clears_the_accepted_note() {
        let (mut engine, rx) = test_engine();
        engine.on_frame(&frame(Some(441.0)));
        engine.on_frame(&frame(Some(441.0)));
        drain_note_events(&rx);

        engine.set_auto_mode(false);
        assert!(engine.accepted_note().is_none());

        // Back on: the filter restarts from idle, so one frame is not
        // enough to re-accept.
        engine.set_auto_mode(true);
        engine.on_frame(&frame(Some(441.0)));
        assert!(drain_note_events(&rx).is_empty());
        engine.on_frame(&frame(Some(441.0)));
        assert_eq!(drain_note_events(&rx).len(), 1);
    }

    #[test]
    fn select_manual_requires_manual_mode_and_a_known_id() {
        let (mut engine, _rx) = test_engine();
        assert!(engine.select_manual("A4").is_err(), "auto mode still on");

        engine.set_auto_mode(false);
        assert!(engine.select_manual("H9").is_err(), "unknown id");

        let token = engine.select_manual("A4");
        assert!(token.is_ok());
        assert_eq!(engine.manual_selection().unwrap().id, "A4");
    }

    #[test]
    fn manual_selection_events_round_trip() {
        let (mut engine, rx) = test_engine();
        engine.set_auto_mode(false);
        engine.select_manual("A4").unwrap();
        engine.deselect_manual();

        let selections: Vec<Option<String>> = rx
            .try_iter()
            .filter_map(|e| match e {
                TunerEvent::ManualSelection(m) => Some(m.note_id),
                _ => None,
            })
            .collect();
        assert_eq!(selections, vec![Some("A4".to_string()), None]);
    }

    #[test]
    fn stale_timer_token_cannot_clear_a_newer_selection() {
        let (mut engine, _rx) = test_engine();
        engine.set_auto_mode(false);

        let old = engine.select_manual("A4").unwrap();
        let _new = engine.select_manual("C5").unwrap();

        engine.expire_manual(old);
        assert_eq!(
            engine.manual_selection().unwrap().id,
            "C5",
            "the old selection's timer must not clear the new selection"
        );
    }

    #[test]
    fn current_timer_token_expires_the_selection() {
        let (mut engine, rx) = test_engine();
        engine.set_auto_mode(false);
        let token = engine.select_manual("A4").unwrap();

        engine.expire_manual(token);
        assert!(engine.manual_selection().is_none());

        let last = rx.try_iter().last();
        assert!(matches!(
            last,
            Some(TunerEvent::ManualSelection(ManualSelectionEvent { note_id: None }))
        ));
    }

    #[test]
    fn early_deselect_invalidates_the_pending_timer() {
        let (mut engine, _rx) = test_engine();
        engine.set_auto_mode(false);

        let token = engine.select_manual("A4").unwrap();
        engine.deselect_manual();
        let _token2 = engine.select_manual("C5").unwrap();

        // The first selection's timer fires late.
        engine.expire_manual(token);
        assert_eq!(engine.manual_selection().unwrap().id, "C5");
    }

    #[test]
    fn entering_auto_mode_drops_the_manual_selection() {
        let (mut engine, rx) = test_engine();
        engine.set_auto_mode(false);
        engine.select_manual("A4").unwrap();

        engine.set_auto_mode(true);
        assert!(engine.manual_selection().is_none());
        let last = rx.try_iter().last();
        assert!(matches!(
            last,
            Some(TunerEvent::ManualSelection(ManualSelectionEvent { note_id: None }))
        ));
    }
}
