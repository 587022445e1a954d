//! The engine object the UI side talks to.
//!
//! `AudioEngine` owns the whole audio lifecycle: nothing exists until
//! `init` (or `init_offline`) runs, and every call before that is a silent
//! no-op, so a UI can fire settings and triggers speculatively. Voices are
//! built here, on the caller's thread, and handed to the renderer over the
//! command queue; no call ever waits on the audio thread.

use tracing::{debug, info, trace, warn};

use crate::audio::{AudioHandle, CommandSender, OfflineAudio, SampleClock, StereoFrame, Voice};
use crate::audio::{start_audio, synth};
use crate::audio_api::{AudioCommand, TriggerParams};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::settings::{EffectSettings, SynthParams};
use crate::shared::InstrumentKind;

enum Backend {
    Device(AudioHandle),
    Offline(OfflineAudio),
}

impl Backend {
    fn commands(&self) -> &CommandSender {
        match self {
            Backend::Device(h) => h.commands(),
            Backend::Offline(o) => o.commands(),
        }
    }

    fn clock(&self) -> &SampleClock {
        match self {
            Backend::Device(h) => h.clock(),
            Backend::Offline(o) => o.clock(),
        }
    }

    fn sample_rate(&self) -> f32 {
        match self {
            Backend::Device(h) => h.sample_rate(),
            Backend::Offline(o) => o.sample_rate(),
        }
    }

    fn drop_retired(&self) -> usize {
        match self {
            Backend::Device(h) => h.drop_retired(),
            Backend::Offline(o) => o.drop_retired(),
        }
    }
}

pub struct AudioEngine {
    config: EngineConfig,
    backend: Option<Backend>,
}

impl AudioEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// Open the output device. Safe to call again: later calls only resume
    /// a stream that was suspended.
    pub fn init(&mut self) -> Result<(), EngineError> {
        match &self.backend {
            Some(Backend::Device(handle)) => {
                handle.resume()?;
                debug!("audio output resumed");
            }
            Some(Backend::Offline(_)) => {}
            None => {
                let handle = start_audio(&self.config).inspect_err(|e| warn!("audio init failed: {e:#}"))?;
                info!(sample_rate = handle.sample_rate(), "audio engine initialised");
                self.backend = Some(Backend::Device(handle));
            }
        }
        Ok(())
    }

    /// Build the renderer without a device; blocks are pulled with `render`.
    pub fn init_offline(&mut self, sample_rate: f32) -> Result<(), EngineError> {
        if self.backend.is_none() {
            let offline = OfflineAudio::new(sample_rate, &self.config)?;
            info!(sample_rate, "offline audio engine initialised");
            self.backend = Some(Backend::Offline(offline));
        }
        Ok(())
    }

    /// Pull the next `out.len()` frames from an offline engine. Anything
    /// else (device-backed or not initialised) just gets silence.
    pub fn render(&mut self, out: &mut [StereoFrame]) {
        match &mut self.backend {
            Some(Backend::Offline(offline)) => offline.render(out),
            _ => out.fill(StereoFrame::zero()),
        }
    }

    pub fn update_track_settings(
        &self,
        kind: InstrumentKind,
        settings: &EffectSettings,
    ) -> Result<(), EngineError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        backend.commands().send(AudioCommand::ApplySettings {
            kind,
            settings: *settings,
        })
    }

    /// Trigger one voice as soon as possible.
    pub fn play_sound(
        &self,
        kind: InstrumentKind,
        params: &SynthParams,
        frequency: Option<f32>,
    ) -> Result<(), EngineError> {
        self.trigger(kind, params, frequency, None)
    }

    /// Trigger one voice at an absolute frame of the sample clock.
    pub fn play_sound_at(
        &self,
        kind: InstrumentKind,
        params: &SynthParams,
        frequency: Option<f32>,
        at: u64,
    ) -> Result<(), EngineError> {
        self.trigger(kind, params, frequency, Some(at))
    }

    fn trigger(
        &self,
        kind: InstrumentKind,
        params: &SynthParams,
        frequency: Option<f32>,
        at: Option<u64>,
    ) -> Result<(), EngineError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        // every trigger also frees whatever the renderer has finished with
        backend.drop_retired();
        let layers = synth::voice_layers(kind, params, frequency);
        let voice = Voice::new(layers, backend.sample_rate(), 0, rand::random());
        trace!(%kind, ?at, seconds = voice.duration(), "voice queued");
        let sent = backend
            .commands()
            .send(AudioCommand::Trigger(TriggerParams { kind, voice, at }));
        if let Err(e) = &sent {
            debug!(%kind, "voice dropped: {e}");
        }
        sent
    }

    /// Pause the device stream; `init` brings it back.
    pub fn suspend(&self) -> Result<(), EngineError> {
        if let Some(Backend::Device(handle)) = &self.backend {
            handle.pause()?;
            debug!("audio output suspended");
        }
        Ok(())
    }

    /// Tear the backend down. The engine can be initialised again afterwards.
    pub fn shutdown(&mut self) {
        if self.backend.take().is_some() {
            info!("audio engine shut down");
        }
    }

    /// Frames rendered so far; 0 before init.
    pub fn now(&self) -> u64 {
        self.backend.as_ref().map_or(0, |b| b.clock().now())
    }

    pub fn clock(&self) -> Option<SampleClock> {
        self.backend.as_ref().map(|b| b.clock().clone())
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.backend.as_ref().map(Backend::sample_rate)
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn small_config() -> EngineConfig {
        EngineConfig {
            impulse_seconds: 0.05,
            reverb_partition: 64,
            curve_resolution: 1024,
            queue_capacity: 8,
            ..Default::default()
        }
    }

    fn offline() -> AudioEngine {
        let mut engine = AudioEngine::new(small_config());
        engine.init_offline(SR).unwrap();
        engine
    }

    fn render(engine: &mut AudioEngine, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        engine.render(&mut out);
        out
    }

    #[test]
    fn calls_before_init_are_silent_no_ops() {
        let mut engine = AudioEngine::new(small_config());
        assert!(!engine.is_initialized());
        let p = SynthParams::default();
        assert!(engine.play_sound(InstrumentKind::Kick, &p, None).is_ok());
        assert!(engine.play_sound_at(InstrumentKind::Bass, &p, Some(55.0), 100).is_ok());
        assert!(engine.update_track_settings(InstrumentKind::Lead, &EffectSettings::default()).is_ok());
        assert!(engine.suspend().is_ok());
        assert_eq!(engine.now(), 0);
        assert_eq!(engine.sample_rate(), None);
        let out = render(&mut engine, 64);
        assert!(out.iter().all(|f| f.peak() == 0.0));
    }

    #[test]
    fn init_offline_is_idempotent() {
        let mut engine = offline();
        render(&mut engine, 512);
        engine.init_offline(48000.0).unwrap();
        // still the first renderer: same rate, same clock
        assert_eq!(engine.sample_rate(), Some(SR));
        assert_eq!(engine.now(), 512);
    }

    #[test]
    fn play_sound_is_heard() {
        let mut engine = offline();
        engine.play_sound(InstrumentKind::Snare, &SynthParams::default(), None).unwrap();
        let out = render(&mut engine, 4096);
        assert!(out.iter().any(|f| f.peak() > 0.01));
        assert_eq!(engine.now(), 4096);
    }

    #[test]
    fn scheduled_sound_waits_for_its_frame() {
        let mut engine = offline();
        engine
            .play_sound_at(InstrumentKind::Snare, &SynthParams::default(), None, 2000)
            .unwrap();
        let out = render(&mut engine, 4000);
        assert!(out[..2000].iter().all(|f| f.peak() == 0.0));
        assert!(out[2000..].iter().any(|f| f.peak() > 0.01));
    }

    #[test]
    fn settings_on_one_track_leave_the_others_alone() {
        let mut engine = offline();
        let mute = EffectSettings { volume: 0.0, ..Default::default() };
        engine.update_track_settings(InstrumentKind::Kick, &mute).unwrap();
        engine.play_sound(InstrumentKind::Kick, &SynthParams::default(), None).unwrap();
        engine.play_sound(InstrumentKind::Clap, &SynthParams::default(), None).unwrap();
        let both = render(&mut engine, 8192);

        let mut clap_only = offline();
        clap_only.play_sound(InstrumentKind::Clap, &SynthParams::default(), None).unwrap();
        let alone = render(&mut clap_only, 8192);

        // noise seeds differ per trigger, so compare loudness, not samples
        let energy = |buf: &[StereoFrame]| -> f32 { buf.iter().map(|f| f.left * f.left).sum() };
        let (a, b) = (energy(&both), energy(&alone));
        assert!(a > 0.0 && b > 0.0);
        assert!((a / b - 1.0).abs() < 0.5, "energy {a} vs {b}");
    }

    #[test]
    fn full_queue_is_resource_exhausted() {
        let engine = offline();
        let p = SynthParams::default();
        // nothing renders, so the queue never drains
        let results: Vec<_> = (0..20)
            .map(|_| engine.play_sound(InstrumentKind::HiHat, &p, None))
            .collect();
        assert!(results[..8].iter().all(Result::is_ok));
        assert!(matches!(results[8], Err(EngineError::ResourceExhausted(_))));
    }

    #[test]
    fn finished_voices_are_freed_on_the_calling_side() {
        let mut engine = offline();
        let p = SynthParams::default();
        engine.play_sound(InstrumentKind::HiHat, &p, None).unwrap();
        engine.play_sound(InstrumentKind::Kick, &p, None).unwrap();
        // hihat 0.25 s, kick 0.6 s
        render(&mut engine, 16_000);
        let backend = engine.backend.as_ref().unwrap();
        assert_eq!(backend.drop_retired(), 1);
        render(&mut engine, 16_000);
        // the next trigger sweeps up the kick
        engine.play_sound(InstrumentKind::Snare, &p, None).unwrap();
        assert_eq!(engine.backend.as_ref().unwrap().drop_retired(), 0);
    }

    #[test]
    fn shutdown_returns_to_uninitialised() {
        let mut engine = offline();
        engine.shutdown();
        assert!(!engine.is_initialized());
        assert!(engine.play_sound(InstrumentKind::Kick, &SynthParams::default(), None).is_ok());
        engine.init_offline(SR).unwrap();
        assert_eq!(engine.now(), 0);
    }
}
