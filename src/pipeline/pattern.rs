// The bar the sequencer reads from: which cells are on, which pitch each
// melodic step carries, and the per-track sound settings. Owned by the UI
// side; the audio engine only ever sees snapshots of it.

use serde::{Deserialize, Serialize};

use crate::pipeline::settings::{SynthParams, TrackSettings};
use crate::shared::{InstrumentKind, NUM_INSTRUMENTS, STEPS};

/// One row per instrument (in `InstrumentKind::ALL` order), one column per step.
pub type GridState = [[bool; STEPS]; NUM_INSTRUMENTS];

/// Per-step pitch in Hz; 0 means "use the voice's own pitch".
pub type Melodies = [[f32; STEPS]; NUM_INSTRUMENTS];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepTrigger {
    pub kind: InstrumentKind,
    pub params: SynthParams,
    pub frequency: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub grid: GridState,
    pub melodies: Melodies,
    pub tracks: [TrackSettings; NUM_INSTRUMENTS],
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            grid: [[false; STEPS]; NUM_INSTRUMENTS],
            melodies: [[0.0; STEPS]; NUM_INSTRUMENTS],
            tracks: [TrackSettings::default(); NUM_INSTRUMENTS],
        }
    }
}

impl Pattern {
    pub fn is_active(&self, kind: InstrumentKind, step: usize) -> bool {
        self.grid[kind.index()][step % STEPS]
    }

    pub fn set_active(&mut self, kind: InstrumentKind, step: usize, on: bool) {
        self.grid[kind.index()][step % STEPS] = on;
    }

    pub fn toggle(&mut self, kind: InstrumentKind, step: usize) {
        self.set_active(kind, step, !self.is_active(kind, step));
    }

    pub fn set_melody(&mut self, kind: InstrumentKind, step: usize, freq: f32) {
        self.melodies[kind.index()][step % STEPS] = freq;
    }

    pub fn track(&self, kind: InstrumentKind) -> &TrackSettings {
        &self.tracks[kind.index()]
    }

    pub fn track_mut(&mut self, kind: InstrumentKind) -> &mut TrackSettings {
        &mut self.tracks[kind.index()]
    }

    pub fn toggle_mute(&mut self, kind: InstrumentKind) {
        let track = self.track_mut(kind);
        track.muted = !track.muted;
    }

    /// Every voice due at `step`: active cells on unmuted tracks, with the
    /// step's melody pitch when it has one.
    pub fn triggers(&self, step: usize) -> impl Iterator<Item = StepTrigger> + '_ {
        let step = step % STEPS;
        InstrumentKind::ALL.into_iter().filter_map(move |kind| {
            let i = kind.index();
            let track = &self.tracks[i];
            if !self.grid[i][step] || track.muted {
                return None;
            }
            let freq = self.melodies[i][step];
            Some(StepTrigger {
                kind,
                params: track.synth,
                frequency: (kind.is_melodic() && freq > 0.0).then_some(freq),
            })
        })
    }

    /// Empty grid and melodies. Track settings stay.
    pub fn clear(&mut self) {
        self.grid = [[false; STEPS]; NUM_INSTRUMENTS];
        self.melodies = [[0.0; STEPS]; NUM_INSTRUMENTS];
    }
}
