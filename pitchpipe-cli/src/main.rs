//! # Pitchpipe - terminal instrument tuner
//!
//! Thin front end around `pitchpipe-core`. Three worker threads feed a
//! single engine:
//! - **Audio thread**: captures microphone frames, runs the FFT and the
//!   fundamental estimator, and forwards observations as commands.
//! - **Engine thread**: owns the `TunerEngine` and drains one command
//!   channel, which serializes frame delivery, control calls and the
//!   deferred manual-deselection timers against each other.
//! - **Stdin thread**: turns typed commands into engine control calls.
//!
//! The main thread renders emitted events as a live status line.

mod oscillator;

use crossbeam_channel::{Receiver, Sender};
use std::io::{self, BufRead, Write};
use std::thread;

use oscillator::CpalOscillator;
use pitchpipe_core::catalog::NoteCatalog;
use pitchpipe_core::engine::{MANUAL_TONE_DURATION, ManualToken, TunerEngine};
use pitchpipe_core::fft::SpectrumAnalyzer;
use pitchpipe_core::pitch::FundamentalEstimator;
use pitchpipe_core::tone::{Oscillator, ReferenceTonePlayer};
use pitchpipe_core::tuning::NEEDLE_SWING_DEGREES;
use pitchpipe_core::{FrameObservation, TunerEvent, audio, spectrum};

/// Everything the engine thread can be asked to do.
enum Command {
    Frame(FrameObservation),
    SetAutoMode(bool),
    SelectManual(String),
    DeselectManual,
    ExpireManual(ManualToken),
    Quit,
}

fn main() {
    eprintln!("[MAIN] Starting pitchpipe...");

    let (command_tx, command_rx) = crossbeam_channel::unbounded::<Command>();
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<TunerEvent>();

    let timer_tx = command_tx.clone();
    let engine_thread = thread::spawn(move || run_engine(command_rx, timer_tx, event_tx));

    let audio_tx = command_tx.clone();
    thread::spawn(move || run_audio(audio_tx));

    let stdin_tx = command_tx;
    thread::spawn(move || run_stdin(stdin_tx));

    print_help();
    render_events(event_rx);

    let _ = engine_thread.join();
    eprintln!("[MAIN] Goodbye.");
}

/// Engine worker. Builds the engine (and its oscillator backend) on
/// this thread and processes commands until told to quit.
fn run_engine(commands: Receiver<Command>, timers: Sender<Command>, events: Sender<TunerEvent>) {
    let tone = ReferenceTonePlayer::new(
        CpalOscillator::new().map(|osc| Box::new(osc) as Box<dyn Oscillator>),
    );
    let mut engine = TunerEngine::new(
        NoteCatalog::standard(),
        spectrum::DISPLAY_BIN_COUNT,
        tone,
        events,
    );

    for command in commands.iter() {
        match command {
            Command::Frame(observation) => engine.on_frame(&observation),
            Command::SetAutoMode(enabled) => {
                eprintln!("[ENGINE] Auto mode: {}", if enabled { "on" } else { "off" });
                engine.set_auto_mode(enabled);
            }
            Command::SelectManual(note_id) => match engine.select_manual(&note_id) {
                Ok(token) => schedule_deselection(&timers, token),
                Err(e) => eprintln!("[ENGINE] Manual selection rejected: {}", e),
            },
            Command::DeselectManual => engine.deselect_manual(),
            Command::ExpireManual(token) => engine.expire_manual(token),
            Command::Quit => break,
        }
    }
    eprintln!("[ENGINE] Engine thread finished");
}

/// Arms the 2 s deselection timer for a fresh manual selection. The
/// token makes a late-firing timer harmless: the engine ignores it if
/// the selection has changed in the meantime.
fn schedule_deselection(timers: &Sender<Command>, token: ManualToken) {
    let timers = timers.clone();
    thread::spawn(move || {
        thread::sleep(MANUAL_TONE_DURATION);
        let _ = timers.send(Command::ExpireManual(token));
    });
}

/// Audio worker. Captures frames and turns each one into a
/// `FrameObservation` for the engine.
fn run_audio(commands: Sender<Command>) {
    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let (stream, sample_rate) = match audio::start_capture(raw_tx) {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("[AUDIO] Fatal error starting capture: {}", e);
            return;
        }
    };

    let analyzer = SpectrumAnalyzer::new(audio::FRAME_SIZE);
    let mut estimator = FundamentalEstimator::default();

    for frame in raw_rx.iter() {
        let magnitude_spectrum = analyzer.magnitudes(&frame);
        let frequency_hz = estimator.estimate(&frame, sample_rate);
        let observation = FrameObservation {
            frequency_hz,
            magnitude_spectrum,
        };
        if commands.send(Command::Frame(observation)).is_err() {
            break;
        }
    }

    drop(stream);
    eprintln!("[AUDIO] Audio thread finished");
}

/// Stdin worker. One command per line.
fn run_stdin(commands: Sender<Command>) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let command = match line.trim() {
            "" => continue,
            "auto on" => Command::SetAutoMode(true),
            "auto off" => Command::SetAutoMode(false),
            "clear" => Command::DeselectManual,
            "quit" | "q" => Command::Quit,
            "help" | "?" => {
                print_help();
                continue;
            }
            note_id => Command::SelectManual(note_id.to_uppercase()),
        };
        let quitting = matches!(command, Command::Quit);
        if commands.send(command).is_err() || quitting {
            break;
        }
    }
}

fn print_help() {
    println!("pitchpipe - play a note and watch the needle");
    println!("  auto on | auto off   toggle automatic detection");
    println!("  <note id>            e.g. A4 or C#3: sound a reference tone (manual mode)");
    println!("  clear                drop the manual selection");
    println!("  quit                 exit");
}

/// Renders engine events until the engine thread hangs up.
fn render_events(events: Receiver<TunerEvent>) {
    let mut note_line = String::from("listening...");
    for event in events.iter() {
        match event {
            TunerEvent::Spectrum(s) => {
                print!("\r{:<34} {:<60}", sparkline(&s.bins), note_line);
                let _ = io::stdout().flush();
            }
            TunerEvent::Note(n) => {
                note_line = format!(
                    "{:<4} {:8.2} Hz  {}  {:+6.1}°",
                    n.note_id,
                    n.observed_frequency_hz,
                    needle(n.needle_angle_degrees),
                    n.needle_angle_degrees
                );
            }
            TunerEvent::ManualSelection(m) => match m.note_id {
                Some(id) => note_line = format!("manual: {} (reference tone)", id),
                None => note_line = String::from("listening..."),
            },
        }
    }
    println!();
}

/// A fixed-width needle gauge; center is in tune, left flat, right sharp.
fn needle(angle_degrees: f64) -> String {
    const WIDTH: usize = 21;
    let position = ((angle_degrees + NEEDLE_SWING_DEGREES) / (2.0 * NEEDLE_SWING_DEGREES)
        * (WIDTH - 1) as f64)
        .round() as usize;
    let mut cells: Vec<char> = (0..WIDTH)
        .map(|i| if i == WIDTH / 2 { '|' } else { '-' })
        .collect();
    cells[position.min(WIDTH - 1)] = '▾';
    format!("[{}]", cells.into_iter().collect::<String>())
}

/// Compresses the display bins into a short unicode bar strip.
fn sparkline(bins: &[f64]) -> String {
    const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    const WIDTH: usize = 32;
    if bins.is_empty() {
        return String::new();
    }
    let peak = bins.iter().cloned().fold(f64::MIN, f64::max).max(1e-9);
    let stride = (bins.len() / WIDTH).max(1);
    bins.chunks(stride)
        .take(WIDTH)
        .map(|chunk| {
            let level = chunk.iter().cloned().fold(0.0, f64::max) / peak;
            let index = ((level * (GLYPHS.len() - 1) as f64).round() as usize)
                .min(GLYPHS.len() - 1);
            GLYPHS[index]
        })
        .collect()
}
