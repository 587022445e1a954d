use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::AudioCommand;
use crate::config::EngineConfig;
use crate::error::EngineError;

mod chain;
mod clock;
mod compressor;
mod delay;
mod effect;
mod engine;
mod filter;
mod frame;
mod impulse;
mod master;
mod oscillator;
mod param;
mod reverb;
pub mod synth;
mod voice;

pub use chain::{TrackChain, filter_mode};
pub use clock::SampleClock;
pub use effect::{DEFAULT_CURVE_LEN, DRIVE_SCALE, distortion_curve};
pub use engine::{Engine, MAX_BLOCK};
pub use filter::FilterType;
pub use frame::StereoFrame;
pub use impulse::{IMPULSE_SECONDS, ImpulseResponse};
pub use master::{COMPRESSOR_RATIO, COMPRESSOR_THRESHOLD_DB, MASTER_GAIN};
pub use oscillator::Waveform;
pub use param::Param;
pub use reverb::DEFAULT_PARTITION;
pub use voice::{FilterSpec, LayerSpec, SourceSpec, Vibrato, Voice};

// Control-side end of the command queue; shared by both backends.
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<AudioCommand>,
}

impl CommandSender {
    pub fn send(&self, cmd: AudioCommand) -> Result<(), EngineError> {
        match self.tx.try_send(cmd) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EngineError::ResourceExhausted(
                "audio command queue is full".into(),
            )),
            // the renderer is gone (shut down); nothing left to play on
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }
}

fn command_queue(capacity: usize) -> (CommandSender, Receiver<AudioCommand>) {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(capacity.max(1));
    (CommandSender { tx }, rx)
}

// Finished voices travel back to the control side and are freed there.
fn build_engine(
    sample_rate: f32,
    config: &EngineConfig,
    clock: SampleClock,
) -> anyhow::Result<(Engine, Receiver<Voice>)> {
    let ir = ImpulseResponse::generate(sample_rate, config.impulse_seconds, &mut rand::rng());
    let (retire_tx, retire_rx) = crossbeam_channel::bounded(config.queue_capacity.max(1));
    let engine = Engine::new(sample_rate, config, &ir, clock)
        .context("failed to build the reverb kernel")?
        .with_retire_queue(retire_tx);
    Ok((engine, retire_rx))
}

// ── Device backend ────────────────────────────────────────────────

pub struct AudioHandle {
    commands: CommandSender,
    retired: Receiver<Voice>,
    clock: SampleClock,
    sample_rate: f32,
    stream: cpal::Stream,
}

impl AudioHandle {
    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Free the voices the callback has finished with. Returns how many.
    pub fn drop_retired(&self) -> usize {
        self.retired.try_iter().count()
    }

    pub fn resume(&self) -> anyhow::Result<()> {
        self.stream.play().context("failed to resume output stream")
    }

    pub fn pause(&self) -> anyhow::Result<()> {
        self.stream.pause().context("failed to pause output stream")
    }
}

pub fn start_audio(config: &EngineConfig) -> anyhow::Result<AudioHandle> {
    let (commands, rx) = command_queue(config.queue_capacity);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let sample_rate = supported.sample_rate() as f32;
    let channels = supported.channels() as usize;
    let clock = SampleClock::new();

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let (engine, retired) = build_engine(sample_rate, config, clock.clone())?;
            let stream = build_output_stream_f32(&device, &supported.into(), rx, engine, channels)?;
            stream.play().context("failed to play output stream")?;
            tracing::info!(sample_rate, channels, "audio output started");

            Ok(AudioHandle {
                commands,
                retired,
                clock,
                sample_rate,
                stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err| tracing::error!("audio output stream error: {err}");

    // interleaved device buffer -> stereo scratch -> back out per channel
    let mut scratch = vec![StereoFrame::zero(); MAX_BLOCK];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            if channels == 2 {
                let n_frames = data.len() / 2;
                // SAFETY: StereoFrame is repr(C) with two f32 fields, so an
                // interleaved stereo buffer has exactly its layout.
                let frames: &mut [StereoFrame] = unsafe {
                    std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut StereoFrame, n_frames)
                };
                engine.render_block(frames);
                return;
            }

            for out in data.chunks_mut(MAX_BLOCK * channels.max(1)) {
                let n_frames = out.len() / channels.max(1);
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);
                for (dst, f) in out.chunks_mut(channels.max(1)).zip(frames.iter()) {
                    match dst {
                        [mono] => *mono = 0.5 * (f.left + f.right),
                        [l, r, rest @ ..] => {
                            *l = f.left;
                            *r = f.right;
                            rest.fill(0.0);
                        }
                        [] => {}
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// ── Offline backend ───────────────────────────────────────────────

/// Same renderer and command path as the device backend, pulled by the
/// caller instead of a sound card.
pub struct OfflineAudio {
    commands: CommandSender,
    rx: Receiver<AudioCommand>,
    retired: Receiver<Voice>,
    engine: Engine,
    clock: SampleClock,
}

impl OfflineAudio {
    pub fn new(sample_rate: f32, config: &EngineConfig) -> anyhow::Result<Self> {
        let (commands, rx) = command_queue(config.queue_capacity);
        let clock = SampleClock::new();
        let (engine, retired) = build_engine(sample_rate, config, clock.clone())?;
        Ok(Self {
            commands,
            rx,
            retired,
            engine,
            clock,
        })
    }

    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> f32 {
        self.engine.sample_rate()
    }

    pub fn drop_retired(&self) -> usize {
        self.retired.try_iter().count()
    }

    pub fn render(&mut self, out: &mut [StereoFrame]) {
        while let Ok(cmd) = self.rx.try_recv() {
            self.engine.handle_cmd(cmd);
        }
        self.engine.render_block(out);
    }
}
