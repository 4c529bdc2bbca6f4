//! Reference-tone oscillator backed by a cpal output stream.
//!
//! The stream runs a sine generator whose frequency and amplitude are
//! read from atomics, so the engine thread can retune or silence the
//! tone without touching the audio callback.

use anyhow::{Result, anyhow};
use atomic_float::AtomicF32;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use pitchpipe_core::tone::Oscillator;

/// Output level of the reference tone.
const TONE_AMPLITUDE: f32 = 0.2;

pub struct CpalOscillator {
    stream: cpal::Stream,
    frequency: Arc<AtomicF32>,
    amplitude: Arc<AtomicF32>,
}

impl CpalOscillator {
    /// Opens the default output device with a silent sine generator.
    ///
    /// Fails when there is no output device or it cannot produce f32
    /// samples; the tone player degrades to no-ops in that case.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no audio output device available"))?;
        let config = device.default_output_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow!(
                "output device does not support f32 samples ({:?})",
                config.sample_format()
            ));
        }

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        let frequency = Arc::new(AtomicF32::new(0.0));
        let amplitude = Arc::new(AtomicF32::new(0.0));
        let cb_frequency = Arc::clone(&frequency);
        let cb_amplitude = Arc::clone(&amplitude);

        // Normalized phase in [0, 1) survives retuning without clicks.
        let mut phase = 0.0_f32;
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let freq = cb_frequency.load(Ordering::Relaxed);
                let amp = cb_amplitude.load(Ordering::Relaxed);
                let step = freq / sample_rate;
                for frame in data.chunks_mut(channels) {
                    let value = amp * (2.0 * PI * phase).sin();
                    phase = (phase + step) % 1.0;
                    for sample in frame {
                        *sample = value;
                    }
                }
            },
            |err| eprintln!("[TONE] Output stream error: {}", err),
            None,
        )?;
        stream.pause()?;

        Ok(Self {
            stream,
            frequency,
            amplitude,
        })
    }
}

impl Oscillator for CpalOscillator {
    fn play(&mut self, frequency_hz: f64) {
        self.frequency.store(frequency_hz as f32, Ordering::Relaxed);
        self.amplitude.store(TONE_AMPLITUDE, Ordering::Relaxed);
        if let Err(e) = self.stream.play() {
            eprintln!("[TONE] Failed to start output stream: {}", e);
        }
    }

    fn stop(&mut self) {
        self.amplitude.store(0.0, Ordering::Relaxed);
        if let Err(e) = self.stream.pause() {
            eprintln!("[TONE] Failed to pause output stream: {}", e);
        }
    }
}
