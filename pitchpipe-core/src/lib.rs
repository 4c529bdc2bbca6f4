// pitchpipe-core/src/lib.rs

//! The core logic for the pitchpipe instrument tuner.
//! This crate is responsible for audio capture, spectrum analysis,
//! fundamental-frequency estimation, and the note-matching feedback
//! engine. It is completely headless and contains no rendering code;
//! front ends subscribe to the events it emits.

pub mod acceptance;
pub mod audio;
pub mod catalog;
pub mod engine;
pub mod fft;
pub mod pitch;
pub mod spectrum;
pub mod tone;
pub mod tuning;

/// One analysis frame handed to the engine by the audio pipeline.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    /// Estimated fundamental frequency in Hz; `None` when the detector
    /// found no pitch (silence or noise).
    pub frequency_hz: Option<f64>,
    /// Magnitude spectrum, bin index ordered low to high frequency.
    pub magnitude_spectrum: Vec<f64>,
}

/// Emitted every frame with the reduced bins for the bar display.
#[derive(Debug, Clone)]
pub struct SpectrumEvent {
    pub bins: Vec<f64>,
}

/// Emitted only when the acceptance filter confirms a note, carrying
/// everything the needle and note strip need to render.
#[derive(Debug, Clone)]
pub struct NoteEvent {
    pub note_id: String,
    pub note_name: String,
    pub observed_frequency_hz: f64,
    pub deviation: f64,
    pub needle_angle_degrees: f64,
}

/// Emitted when the user's manual note selection changes; `None` means
/// the selection was cleared.
#[derive(Debug, Clone)]
pub struct ManualSelectionEvent {
    pub note_id: Option<String>,
}

/// Everything the engine tells the rendering layer.
#[derive(Debug, Clone)]
pub enum TunerEvent {
    Spectrum(SpectrumEvent),
    Note(NoteEvent),
    ManualSelection(ManualSelectionEvent),
}
