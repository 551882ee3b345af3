//! Realtime engine: a render worker feeding an output sink.
//!
//! [`AudioEngine`] is the main-thread handle. It owns the cpal stream (which
//! must not leave its thread) and a command channel into the worker; the
//! worker owns the [`SynthCore`](crate::SynthCore) and the producing half of
//! a ring buffer. Blocks flow worker → ring → device callback, and the ring
//! doubles as the clock: `push` blocks until the device has made room, so
//! the worker renders exactly as fast as the hardware drains.
//!
//! With no usable output device the engine falls back to a [`NullSink`]
//! that keeps wall-clock pace and discards samples, so gesture-driven state
//! keeps working on headless machines.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use forest_nav::Season;
use ringbuf::traits::*;
use ringbuf::{HeapProd, HeapRb};

use crate::synth::{SynthCore, BLOCK_FRAMES};
use crate::wind_level;

// ════════════════════════════════════════════════════════════════════════════
// Commands
// ════════════════════════════════════════════════════════════════════════════

enum AudioCommand {
    SetSeason(Season),
    SetWind(u8),
    Bird(Option<[f32; 3]>),
    LeafHit,
    GrowthPulse,
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// Sinks
// ════════════════════════════════════════════════════════════════════════════

/// Destination for rendered stereo blocks. `push` must not return until the
/// sink has accepted the whole slice — that back-pressure paces the render
/// loop.
pub trait AudioSink: Send + 'static {
    fn sample_rate(&self) -> f32;
    fn push(&mut self, block: &[f32]);
}

/// Feeds the ring buffer drained by the device callback, expanding the
/// engine's stereo frames to however many channels the device wants.
struct RingSink {
    prod:        HeapProd<f32>,
    channels:    usize,
    sample_rate: f32,
    scratch:     Vec<f32>,
}

impl AudioSink for RingSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn push(&mut self, block: &[f32]) {
        let data: &[f32] = match self.channels {
            2 => block,
            1 => {
                self.scratch.clear();
                self.scratch
                    .extend(block.chunks_exact(2).map(|f| (f[0] + f[1]) * 0.5));
                &self.scratch
            }
            n => {
                self.scratch.clear();
                for frame in block.chunks_exact(2) {
                    for ch in 0..n {
                        self.scratch.push(frame[ch % 2]);
                    }
                }
                &self.scratch
            }
        };

        let mut offset = 0;
        while offset < data.len() {
            offset += self.prod.push_slice(&data[offset..]);
            if offset < data.len() {
                thread::sleep(Duration::from_micros(500));
            }
        }
    }
}

/// Keeps time without a device. Used for headless fallback and tests.
pub struct NullSink {
    sample_rate: f32,
}

impl NullSink {
    pub fn new(sample_rate: f32) -> NullSink {
        NullSink { sample_rate }
    }
}

impl AudioSink for NullSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn push(&mut self, block: &[f32]) {
        let frames = block.len() / 2;
        thread::sleep(Duration::from_secs_f32(frames as f32 / self.sample_rate));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Device plumbing
// ════════════════════════════════════════════════════════════════════════════

fn open_device(latency_ms: u32) -> Result<(cpal::Stream, RingSink), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no default output device".to_string())?;
    let config = device.default_output_config().map_err(|e| e.to_string())?;
    if !matches!(config.sample_format(), cpal::SampleFormat::F32) {
        return Err(format!("unsupported sample format {:?}", config.sample_format()));
    }

    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0 as f32;
    let stream_config: cpal::StreamConfig = config.into();

    let capacity = ((sample_rate * latency_ms as f32 / 1000.0) as usize * channels)
        .max(BLOCK_FRAMES * channels * 4);
    let (prod, mut cons) = HeapRb::<f32>::new(capacity).split();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Underruns read as silence rather than stale samples.
                for sample in data.iter_mut() {
                    *sample = cons.try_pop().unwrap_or(0.0);
                }
            },
            |err| eprintln!("[audio] stream error: {err}"),
            None,
        )
        .map_err(|e| e.to_string())?;
    stream.play().map_err(|e| e.to_string())?;

    Ok((stream, RingSink { prod, channels, sample_rate, scratch: Vec::new() }))
}

// ════════════════════════════════════════════════════════════════════════════
// AudioEngine
// ════════════════════════════════════════════════════════════════════════════

/// Main-thread handle to the audio worker.
///
/// All control methods are fire-and-forget sends; audible changes land
/// within one render block (~6 ms). The handle is not `Send` — the cpal
/// stream it owns must stay on the thread that built it.
pub struct AudioEngine {
    tx:      Sender<AudioCommand>,
    worker:  Option<JoinHandle<()>>,
    _stream: Option<cpal::Stream>,
    live:    bool,
}

impl AudioEngine {
    /// Open the default output device and start rendering. When no device
    /// is usable, logs the reason and runs silent instead of failing —
    /// callers treat audio as best-effort.
    pub fn start(latency_ms: u32, seed: u64) -> AudioEngine {
        match open_device(latency_ms) {
            Ok((stream, sink)) => {
                let (tx, rx) = mpsc::channel();
                let worker = thread::spawn(move || engine_thread(Box::new(sink), rx, seed));
                AudioEngine { tx, worker: Some(worker), _stream: Some(stream), live: true }
            }
            Err(e) => {
                eprintln!("[audio] no usable output device ({e}); running silent");
                AudioEngine::start_silent(seed)
            }
        }
    }

    /// Start against a [`NullSink`]. The full command path runs; nothing
    /// reaches the hardware.
    pub fn start_silent(seed: u64) -> AudioEngine {
        let (tx, rx) = mpsc::channel();
        let sink = NullSink::new(44_100.0);
        let worker = thread::spawn(move || engine_thread(Box::new(sink), rx, seed));
        AudioEngine { tx, worker: Some(worker), _stream: None, live: false }
    }

    /// `true` when a real output device is attached.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_season(&self, season: Season) {
        let _ = self.tx.send(AudioCommand::SetSeason(season));
    }

    /// Quantize a continuous wind intensity onto the preset levels and
    /// retarget the bed. Intensities at or below 0.05 count as calm.
    pub fn set_wind_intensity(&self, intensity: f32) {
        let level = if intensity <= 0.05 { 0 } else { wind_level(intensity) };
        let _ = self.tx.send(AudioCommand::SetWind(level));
    }

    /// One bird call, optionally placed in listener space for pan and
    /// distance attenuation.
    pub fn play_bird_sound(&self, position: Option<[f32; 3]>) {
        let _ = self.tx.send(AudioCommand::Bird(position));
    }

    pub fn play_leaf_hit(&self) {
        let _ = self.tx.send(AudioCommand::LeafHit);
    }

    pub fn play_growth_pulse(&self) {
        let _ = self.tx.send(AudioCommand::GrowthPulse);
    }

    /// Stop the worker and wait for it to exit.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(AudioCommand::Quit);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Worker
// ════════════════════════════════════════════════════════════════════════════

fn engine_thread(mut sink: Box<dyn AudioSink>, rx: Receiver<AudioCommand>, seed: u64) {
    let mut core = SynthCore::new(sink.sample_rate(), seed);
    let mut block = vec![0.0f32; BLOCK_FRAMES * 2];

    loop {
        loop {
            match rx.try_recv() {
                Ok(AudioCommand::SetSeason(season)) => core.set_season(season),
                Ok(AudioCommand::SetWind(level)) => core.set_wind(level),
                Ok(AudioCommand::Bird(position)) => core.trigger_bird(position),
                Ok(AudioCommand::LeafHit) => core.trigger_leaf(),
                Ok(AudioCommand::GrowthPulse) => core.trigger_growth(),
                Ok(AudioCommand::Quit) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }
        core.render(&mut block);
        sink.push(&block);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_sink_passes_stereo_through() {
        let (prod, mut cons) = HeapRb::<f32>::new(64).split();
        let mut sink = RingSink { prod, channels: 2, sample_rate: 48_000.0, scratch: Vec::new() };
        sink.push(&[0.1, -0.2, 0.3, -0.4]);

        let mut out = [0.0f32; 4];
        assert_eq!(cons.pop_slice(&mut out), 4);
        assert_eq!(out, [0.1, -0.2, 0.3, -0.4]);
    }

    #[test]
    fn ring_sink_downmixes_to_mono() {
        let (prod, mut cons) = HeapRb::<f32>::new(64).split();
        let mut sink = RingSink { prod, channels: 1, sample_rate: 48_000.0, scratch: Vec::new() };
        sink.push(&[0.1, 0.3]);

        let mut out = [0.0f32; 1];
        assert_eq!(cons.pop_slice(&mut out), 1);
        assert!((out[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn ring_sink_tiles_extra_channels() {
        let (prod, mut cons) = HeapRb::<f32>::new(64).split();
        let mut sink = RingSink { prod, channels: 4, sample_rate: 48_000.0, scratch: Vec::new() };
        sink.push(&[0.1, 0.2]);

        let mut out = [0.0f32; 4];
        assert_eq!(cons.pop_slice(&mut out), 4);
        assert_eq!(out, [0.1, 0.2, 0.1, 0.2]);
    }

    #[test]
    fn silent_engine_accepts_the_full_command_set() {
        let engine = AudioEngine::start_silent(42);
        assert!(!engine.is_live());

        engine.set_season(Season::Winter);
        engine.set_wind_intensity(0.7);
        engine.play_bird_sound(Some([1.0, 0.0, -2.0]));
        engine.play_leaf_hit();
        engine.play_growth_pulse();

        thread::sleep(Duration::from_millis(30));
        engine.quit();
    }
}
