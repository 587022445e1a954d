use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::audio_api::{AudioCommand, TriggerParams};
use crate::config::EngineConfig;
use crate::shared::{InstrumentKind, NUM_INSTRUMENTS};

use super::chain::TrackChain;
use super::clock::SampleClock;
use super::frame::StereoFrame;
use super::impulse::ImpulseResponse;
use super::master::MasterBus;
use super::reverb::ReverbKernel;
use super::voice::Voice;

// scratch buffers are sized once; bigger device blocks are cut into these
pub const MAX_BLOCK: usize = 512;
// room reserved per track up front; more voices just grow the list
pub const VOICE_RESERVE: usize = 64;

pub struct Engine {
    sample_rate: f32,
    chains: Vec<TrackChain>, // indexed by InstrumentKind::index()
    voices: Vec<Vec<Voice>>,
    master: MasterBus,
    track_buf: Vec<f32>,
    mix_buf: Vec<StereoFrame>,
    frames_rendered: u64,
    clock: SampleClock,
    retired: Option<Sender<Voice>>,
}

impl Engine {
    /// Builds the impulse, the shared reverb kernel and all six chains.
    pub fn new(
        sample_rate: f32,
        config: &EngineConfig,
        ir: &ImpulseResponse,
        clock: SampleClock,
    ) -> anyhow::Result<Self> {
        let kernel = Arc::new(ReverbKernel::new(ir, config.reverb_partition)?);
        let chains = (0..NUM_INSTRUMENTS)
            .map(|_| TrackChain::new(sample_rate, config.curve_resolution, Arc::clone(&kernel)))
            .collect();
        let voices = (0..NUM_INSTRUMENTS)
            .map(|_| Vec::with_capacity(VOICE_RESERVE))
            .collect();
        Ok(Self {
            sample_rate,
            chains,
            voices,
            master: MasterBus::new(
                sample_rate,
                config.master_gain,
                config.compressor_threshold_db,
                config.compressor_ratio,
            ),
            track_buf: vec![0.0; MAX_BLOCK],
            mix_buf: vec![StereoFrame::zero(); MAX_BLOCK],
            frames_rendered: 0,
            clock,
            retired: None,
        })
    }

    /// Finished voices are sent here instead of being freed on the render
    /// thread. Whoever holds the receiver drops them.
    pub fn with_retire_queue(mut self, tx: Sender<Voice>) -> Self {
        self.retired = Some(tx);
        self
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[cfg(test)]
    fn active_voices(&self, kind: InstrumentKind) -> usize {
        self.voices[kind.index()].len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::ApplySettings { kind, settings } => {
                self.chains[kind.index()].apply_settings(&settings)
            }
            AudioCommand::Trigger(t) => self.trigger_voice(t),
        }
    }

    fn trigger_voice(&mut self, t: TriggerParams) {
        let TriggerParams { kind, mut voice, at } = t;
        // a deadline that already passed plays from the top of this block
        let start = at.unwrap_or(self.frames_rendered).max(self.frames_rendered);
        voice.set_start(start);
        self.voices[kind.index()].push(voice);
    }

    /// Fill `out` with the next `out.len()` frames and publish the clock.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for chunk in out.chunks_mut(MAX_BLOCK) {
            self.render_chunk(chunk);
        }
        self.clock.publish(self.frames_rendered);
    }

    fn render_chunk(&mut self, out: &mut [StereoFrame]) {
        let n = out.len();
        let block_start = self.frames_rendered;
        let block_end = block_start + n as u64;
        let mix = &mut self.mix_buf[..n];
        mix.fill(StereoFrame::zero());

        for (chain, voices) in self.chains.iter_mut().zip(self.voices.iter_mut()) {
            let input = &mut self.track_buf[..n];
            input.fill(0.0);
            for voice in voices.iter_mut() {
                voice.render(block_start, input);
            }
            let mut i = 0;
            while i < voices.len() {
                if !voices[i].is_finished_at(block_end) {
                    i += 1;
                    continue;
                }
                let done = voices.swap_remove(i);
                if let Some(tx) = &self.retired {
                    // a full queue hands the voice back and it is freed here
                    let _ = tx.try_send(done);
                }
            }
            // chains run even without voices so delay and reverb tails ring out
            chain.process(input, mix);
        }

        self.master.process(mix);
        out.copy_from_slice(mix);
        self.frames_rendered = block_end;
    }
}
