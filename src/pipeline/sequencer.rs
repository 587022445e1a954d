//! Look-ahead step scheduler.
//!
//! The sequencer never sleeps and never owns a timer. The caller polls it
//! with the current frame of the audio clock; every step whose deadline
//! falls inside the look-ahead window is handed out as a `Tick` carrying an
//! absolute frame, which the caller turns into scheduled voices. Deadlines
//! are kept as fractional frames and advanced by addition, so a step that
//! isn't a whole number of frames long doesn't accumulate rounding drift.

use tracing::{debug, warn};

use crate::shared::{DEFAULT_BPM, STEPS};

const MIN_BPM: f32 = 1.0;

/// Length of one 16th note in milliseconds.
pub fn step_duration_ms(bpm: f32) -> f64 {
    60_000.0 / clip_bpm(bpm) as f64 / 4.0
}

fn clip_bpm(bpm: f32) -> f32 {
    if bpm.is_finite() { bpm.max(MIN_BPM) } else { DEFAULT_BPM }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// One step, due at an absolute frame of the audio clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub step: usize,
    pub at: u64,
}

#[derive(Debug)]
pub struct Sequencer {
    sample_rate: f64,
    lookahead: f64, // frames
    bpm: f32,
    state: TransportState,
    next_step: usize,
    next_deadline: f64,
    current_step: usize,
}

impl Sequencer {
    pub fn new(sample_rate: f32, lookahead_ms: f32) -> Self {
        let sample_rate = sample_rate.max(1.0) as f64;
        Self {
            sample_rate,
            lookahead: (lookahead_ms.max(0.0) as f64) * sample_rate / 1000.0,
            bpm: DEFAULT_BPM,
            state: TransportState::Stopped,
            next_step: 0,
            next_deadline: 0.0,
            current_step: 0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// The step most recently handed out; the playhead.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Frames per step at the current tempo.
    pub fn step_frames(&self) -> f64 {
        step_duration_ms(self.bpm) * self.sample_rate / 1000.0
    }

    /// Start ticking from `now`. The step index carries on from wherever
    /// the last run stopped.
    pub fn start(&mut self, bpm: f32, now: u64) {
        self.bpm = clip_bpm(bpm);
        if self.state == TransportState::Running {
            return;
        }
        self.state = TransportState::Running;
        self.next_deadline = now as f64;
        debug!(bpm = self.bpm, step = self.next_step, now, "sequencer started");
    }

    /// Stop handing out ticks. Voices already scheduled still play.
    pub fn stop(&mut self) {
        if self.state == TransportState::Running {
            self.state = TransportState::Stopped;
            debug!(step = self.next_step, "sequencer stopped");
        }
    }

    /// Takes effect from the next step on.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = clip_bpm(bpm);
    }

    /// Back to step 0, running or not.
    pub fn reset(&mut self) {
        self.next_step = 0;
        self.current_step = 0;
    }

    /// Hand every step due before `now + lookahead` to `on_tick`, in order.
    /// Returns how many were dispatched.
    pub fn poll<F: FnMut(Tick)>(&mut self, now: u64, mut on_tick: F) -> usize {
        if self.state != TransportState::Running {
            return 0;
        }
        let now_f = now as f64;
        let step_frames = self.step_frames();
        if self.next_deadline + step_frames < now_f {
            // the poller stalled for more than a step; pick up from here
            // rather than firing a burst of stale steps
            warn!(
                behind_frames = now_f - self.next_deadline,
                "sequencer fell behind, re-anchoring"
            );
            self.next_deadline = now_f;
        }

        let horizon = now_f + self.lookahead;
        let mut fired = 0;
        while self.next_deadline < horizon {
            let tick = Tick {
                step: self.next_step,
                at: self.next_deadline.round() as u64,
            };
            on_tick(tick);
            fired += 1;
            self.current_step = self.next_step;
            self.next_step = (self.next_step + 1) % STEPS;
            // read the tempo at each advance so bpm changes land on the next step
            self.next_deadline += self.step_frames();
        }
        fired
    }
}
