//! # Reference Tone Module
//!
//! Plays an audible reference tone for a manually selected note. The
//! oscillator itself is a platform concern and lives behind the
//! [`Oscillator`] trait; this module only enforces the player's
//! contract: at most one tone source at a time, and graceful no-op
//! degradation when no audio backend is available.

use anyhow::Result;

/// A continuously running tone source.
///
/// Implementations are provided by the front end (e.g. a cpal output
/// stream). They are expected to be cheap to retune while running.
/// Not `Send`: platform audio handles stay on the thread that made
/// them, so the player is built on the thread that owns the engine.
pub trait Oscillator {
    /// Begin producing a tone at the given frequency, or retune the
    /// already-running tone.
    fn play(&mut self, frequency_hz: f64);

    /// Silence the tone. Called only while playing.
    fn stop(&mut self);
}

/// Manages the single reference-tone oscillator.
///
/// `start` is idempotent: invoking it while a tone is already playing
/// retunes the existing oscillator instead of stacking a second one.
/// `stop` while idle is a no-op. If the audio backend could not be
/// constructed, the failure is reported once here and every later call
/// silently does nothing.
pub struct ReferenceTonePlayer {
    backend: Option<Box<dyn Oscillator>>,
    playing: bool,
}

impl ReferenceTonePlayer {
    /// Wraps the outcome of constructing a platform oscillator.
    ///
    /// An unavailable backend is logged once; the player then degrades
    /// to no-ops rather than failing on every `start`/`stop`.
    pub fn new(backend: Result<Box<dyn Oscillator>>) -> Self {
        let backend = match backend {
            Ok(osc) => Some(osc),
            Err(e) => {
                eprintln!("[TONE] Audio backend unavailable, reference tones disabled: {}", e);
                None
            }
        };
        Self {
            backend,
            playing: false,
        }
    }

    /// A player with no backend at all, for headless use and tests.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            playing: false,
        }
    }

    /// Starts the tone, or retunes it if one is already sounding.
    pub fn start(&mut self, frequency_hz: f64) {
        if let Some(backend) = self.backend.as_mut() {
            backend.play(frequency_hz);
            self.playing = true;
        }
    }

    /// Halts the tone. Safe to call when nothing is playing.
    pub fn stop(&mut self) {
        if self.playing {
            if let Some(backend) = self.backend.as_mut() {
                backend.stop();
            }
            self.playing = false;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
