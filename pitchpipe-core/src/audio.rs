//! # Audio Capture Module
//!
//! Real-time microphone capture via CPAL. Samples arrive from the
//! device callback in arbitrary chunk sizes and are re-framed into
//! fixed-size buffers before being pushed to the analysis thread.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Samples per analysis frame. At 44.1 kHz one frame is ~46 ms, which
/// sets both the frequency resolution of the bar display and the pace
/// of the feedback loop.
pub const FRAME_SIZE: usize = 2048;

/// Sample rate requested from the input device.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Opens the default input device and streams fixed-size frames.
///
/// Each time the device callback has accumulated [`FRAME_SIZE`] mono
/// f32 samples, one frame is pushed into `frames`. Frames are dropped
/// when the channel is full rather than blocking the audio callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Keep the stream alive for as long as
///   capture should run
/// * `Err(e)` - No usable input device or configuration
pub fn start_capture(frames: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;

    eprintln!("[AUDIO] Using input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = pick_input_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("no mono f32 input format available"))?;
    let config = supported.with_sample_rate(cpal::SampleRate(TARGET_SAMPLE_RATE));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    eprintln!("[AUDIO] Capturing at {} Hz", sample_rate);

    // Accumulates device chunks until a full analysis frame is ready.
    let mut pending = Vec::with_capacity(FRAME_SIZE * 2);
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= FRAME_SIZE {
                let frame: Vec<f32> = pending.drain(..FRAME_SIZE).collect();
                let _ = frames.try_send(frame);
            }
        },
        |err| eprintln!("[AUDIO] Stream error: {}", err),
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate))
}

/// Picks a mono f32 configuration whose sample-rate range sits closest
/// to the target rate.
fn pick_input_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| {
            c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0
        })
        .min_by_key(|c| c.max_sample_rate().0 - c.min_sample_rate().0)
}
