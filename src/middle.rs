// Glue between the terminal UI and the engine: owns the pattern, the
// sequencer and the cursor, turns input events into pattern edits and
// engine calls, and feeds sequencer ticks to the engine as scheduled voices.

use gridsynth::pipeline::generate::{self, PRESETS};
use gridsynth::pipeline::pattern::GridState;
use gridsynth::shared::{DEFAULT_BPM, NUM_INSTRUMENTS, STEPS};
use gridsynth::{AudioEngine, InstrumentKind, Pattern, Sequencer};
use tracing::warn;

const BPM_STEP: f32 = 5.0;
const MIN_BPM: f32 = 40.0;
const MAX_BPM: f32 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Quit,
    PlayPress,
    MoveCursor { rows: i32, steps: i32 },
    ToggleCell,
    ToggleMute,
    Audition,
    BpmUp,
    BpmDown,
    Clear,
    NextParam,
    AdjustParam(f32),
    Generate,
    RandomizeTrack,
    RandomizeSounds,
    RandomizeEffects,
    NextPreset,
}

// the knob under the cursor row; synth knobs and a few effect sends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Tone,
    Decay,
    Punch,
    Timbre,
    Cutoff,
    Resonance,
    Distortion,
    DelayTime,
    DelayFeedback,
    Reverb,
    Volume,
}

impl ParamKind {
    const ALL: [ParamKind; 11] = [
        ParamKind::Tone,
        ParamKind::Decay,
        ParamKind::Punch,
        ParamKind::Timbre,
        ParamKind::Cutoff,
        ParamKind::Resonance,
        ParamKind::Distortion,
        ParamKind::DelayTime,
        ParamKind::DelayFeedback,
        ParamKind::Reverb,
        ParamKind::Volume,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Tone => "tone",
            ParamKind::Decay => "decay",
            ParamKind::Punch => "punch",
            ParamKind::Timbre => "timbre",
            ParamKind::Cutoff => "cutoff",
            ParamKind::Resonance => "res",
            ParamKind::Distortion => "drive",
            ParamKind::DelayTime => "delay",
            ParamKind::DelayFeedback => "feedback",
            ParamKind::Reverb => "reverb",
            ParamKind::Volume => "volume",
        }
    }

    fn is_effect(self) -> bool {
        !matches!(self, ParamKind::Tone | ParamKind::Decay | ParamKind::Punch | ParamKind::Timbre)
    }

    fn next(self) -> Self {
        let i = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

// snapshot handed to the view each frame
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub grid: GridState,
    pub muted: [bool; NUM_INSTRUMENTS],
    pub cursor_row: usize,
    pub cursor_step: usize,
    pub playhead: usize,
    pub playing: bool,
    pub bpm: f32,
    pub param: ParamKind,
    pub param_value: f32,
    pub pattern_name: &'static str,
    pub status: String,
}

pub struct Middle {
    engine: AudioEngine,
    pattern: Pattern,
    sequencer: Sequencer,
    bpm: f32,
    cursor_row: usize,
    cursor_step: usize,
    param: ParamKind,
    pattern_name: &'static str,
    next_preset: usize,
    status: String,
}

impl Middle {
    pub fn new(engine: AudioEngine, pattern: Pattern) -> Self {
        let sample_rate = engine
            .sample_rate()
            .unwrap_or(engine.config().sample_rate as f32);
        let sequencer = Sequencer::new(sample_rate, engine.config().lookahead_ms);
        let middle = Self {
            engine,
            pattern,
            sequencer,
            bpm: DEFAULT_BPM,
            cursor_row: 0,
            cursor_step: 0,
            param: ParamKind::Tone,
            pattern_name: "",
            next_preset: 0,
            status: String::new(),
        };
        for kind in InstrumentKind::ALL {
            middle.push_settings(kind);
        }
        middle
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[cfg(test)]
    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    fn selected(&self) -> InstrumentKind {
        InstrumentKind::ALL[self.cursor_row]
    }

    fn push_settings(&self, kind: InstrumentKind) {
        let effects = self.pattern.track(kind).effects;
        if let Err(e) = self.engine.update_track_settings(kind, &effects) {
            warn!(%kind, "settings update dropped: {e}");
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Quit => {}
            InputEvent::PlayPress => self.toggle_play(),
            InputEvent::MoveCursor { rows, steps } => {
                self.cursor_row = wrap(self.cursor_row, rows, NUM_INSTRUMENTS);
                self.cursor_step = wrap(self.cursor_step, steps, STEPS);
            }
            InputEvent::ToggleCell => {
                self.wake();
                self.pattern.toggle(self.selected(), self.cursor_step);
                self.pattern_name = "";
            }
            InputEvent::ToggleMute => self.pattern.toggle_mute(self.selected()),
            InputEvent::Audition => {
                self.wake();
                let kind = self.selected();
                let track = self.pattern.track(kind);
                let freq = self.pattern.melodies[kind.index()][self.cursor_step];
                let freq = (freq > 0.0).then_some(freq);
                if let Err(e) = self.engine.play_sound(kind, &track.synth, freq) {
                    self.status = format!("{kind}: {e}");
                }
            }
            InputEvent::BpmUp => self.set_bpm(self.bpm + BPM_STEP),
            InputEvent::BpmDown => self.set_bpm(self.bpm - BPM_STEP),
            InputEvent::Clear => {
                self.pattern.clear();
                self.sequencer.reset();
                self.pattern_name = "";
            }
            InputEvent::NextParam => self.param = self.param.next(),
            InputEvent::AdjustParam(delta) => self.adjust_param(delta),
            // a fresh bar comes with fresh sounds
            InputEvent::Generate => {
                self.generate();
                self.randomize_sounds(None);
            }
            InputEvent::RandomizeTrack => self.randomize_sounds(Some(self.selected())),
            InputEvent::RandomizeSounds => self.randomize_sounds(None),
            InputEvent::RandomizeEffects => self.randomize_effects(),
            InputEvent::NextPreset => self.load_next_preset(),
        }
    }

    // first interaction (re)opens the output, like a browser's autoplay unlock
    fn wake(&mut self) {
        if let Err(e) = self.engine.init() {
            self.status = format!("audio: {e}");
        }
    }

    fn toggle_play(&mut self) {
        if self.sequencer.is_running() {
            self.sequencer.stop();
            return;
        }
        self.wake();
        self.sequencer.start(self.bpm, self.engine.now());
    }

    fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.sequencer.set_bpm(self.bpm);
    }

    fn param_value(&self) -> f32 {
        let track = self.pattern.track(self.selected());
        match self.param {
            ParamKind::Tone => track.synth.tone,
            ParamKind::Decay => track.synth.decay,
            ParamKind::Punch => track.synth.punch,
            ParamKind::Timbre => track.synth.timbre,
            ParamKind::Cutoff => track.effects.filter_freq,
            ParamKind::Resonance => track.effects.filter_res,
            ParamKind::Distortion => track.effects.distortion,
            ParamKind::DelayTime => track.effects.delay_time,
            ParamKind::DelayFeedback => track.effects.delay_feedback,
            ParamKind::Reverb => track.effects.reverb_mix,
            ParamKind::Volume => track.effects.volume,
        }
    }

    fn adjust_param(&mut self, delta: f32) {
        let kind = self.selected();
        let param = self.param;
        let track = self.pattern.track_mut(kind);
        let knob = |v: &mut f32| *v = (*v + delta).clamp(0.0, 1.0);
        match param {
            ParamKind::Tone => knob(&mut track.synth.tone),
            ParamKind::Decay => knob(&mut track.synth.decay),
            ParamKind::Punch => knob(&mut track.synth.punch),
            ParamKind::Timbre => knob(&mut track.synth.timbre),
            // cutoff moves in octaves-ish so the whole range is reachable
            ParamKind::Cutoff => {
                let f = &mut track.effects.filter_freq;
                *f = (*f * 2f32.powf(delta * 10.0)).clamp(20.0, 20000.0);
            }
            ParamKind::Resonance => {
                let q = &mut track.effects.filter_res;
                *q = (*q + delta * 20.0).clamp(0.0, 20.0);
            }
            ParamKind::Distortion => knob(&mut track.effects.distortion),
            ParamKind::DelayTime => knob(&mut track.effects.delay_time),
            ParamKind::DelayFeedback => {
                let fb = &mut track.effects.delay_feedback;
                *fb = (*fb + delta).clamp(0.0, 0.9);
            }
            ParamKind::Reverb => knob(&mut track.effects.reverb_mix),
            ParamKind::Volume => knob(&mut track.effects.volume),
        }
        if param.is_effect() {
            self.push_settings(kind);
        }
    }

    fn generate(&mut self) {
        generate::generate_pattern(&mut self.pattern, &mut rand::rng());
        self.pattern_name = "Generative Classic";
    }

    fn load_next_preset(&mut self) {
        let preset = &PRESETS[self.next_preset % PRESETS.len()];
        preset.apply(&mut self.pattern);
        self.set_bpm(preset.bpm);
        self.pattern_name = preset.name;
        self.next_preset = (self.next_preset + 1) % PRESETS.len();
    }

    fn randomize_sounds(&mut self, only: Option<InstrumentKind>) {
        let mut rng = rand::rng();
        for kind in InstrumentKind::ALL {
            if only.is_some_and(|k| k != kind) {
                continue;
            }
            generate::randomize_track(kind, self.pattern.track_mut(kind), &mut rng);
            self.push_settings(kind);
        }
    }

    fn randomize_effects(&mut self) {
        let mut rng = rand::rng();
        for kind in InstrumentKind::ALL {
            generate::randomize_effects(&mut self.pattern.track_mut(kind).effects, &mut rng);
            self.push_settings(kind);
        }
    }

    /// Hand every step inside the look-ahead window to the engine.
    pub fn tick(&mut self) -> usize {
        let now = self.engine.now();
        let Self {
            sequencer,
            pattern,
            engine,
            ..
        } = self;
        sequencer.poll(now, |tick| {
            for trig in pattern.triggers(tick.step) {
                // a dropped voice must not stop the bar
                if let Err(e) = engine.play_sound_at(trig.kind, &trig.params, trig.frequency, tick.at) {
                    warn!(kind = %trig.kind, step = tick.step, "step voice dropped: {e}");
                }
            }
        })
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            grid: self.pattern.grid,
            muted: std::array::from_fn(|i| self.pattern.tracks[i].muted),
            cursor_row: self.cursor_row,
            cursor_step: self.cursor_step,
            playhead: self.sequencer.current_step(),
            playing: self.sequencer.is_running(),
            bpm: self.bpm,
            param: self.param,
            param_value: self.param_value(),
            pattern_name: self.pattern_name,
            status: self.status.clone(),
        }
    }
}

fn wrap(pos: usize, delta: i32, len: usize) -> usize {
    (pos as i64 + delta as i64).rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsynth::EngineConfig;
    use gridsynth::audio::StereoFrame;

    const SR: f32 = 44100.0;

    fn middle(pattern: Pattern) -> Middle {
        let config = EngineConfig {
            impulse_seconds: 0.05,
            reverb_partition: 64,
            curve_resolution: 1024,
            ..Default::default()
        };
        let mut engine = AudioEngine::new(config);
        engine.init_offline(SR).unwrap();
        Middle::new(engine, pattern)
    }

    // what the device callback would do: poll the sequencer, render a block
    fn play_for(m: &mut Middle, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        for block in out.chunks_mut(512) {
            m.tick();
            m.engine_mut().render(block);
        }
        out
    }

    fn onsets(buf: &[StereoFrame]) -> Vec<usize> {
        // first loud frame after a stretch of silence
        let mut hits = Vec::new();
        let mut quiet = usize::MAX;
        for (i, f) in buf.iter().enumerate() {
            if f.peak() > 0.01 {
                if quiet > 2000 {
                    hits.push(i);
                }
                quiet = 0;
            } else {
                quiet = quiet.saturating_add(1);
            }
        }
        hits
    }

    #[test]
    fn one_bar_of_kick_sounds_once_on_the_downbeat() {
        let mut pattern = Pattern::default();
        pattern.set_active(InstrumentKind::Kick, 0, true);
        pattern.track_mut(InstrumentKind::Kick).synth.decay = 0.0; // 0.2 s kick
        let mut m = middle(pattern);
        m.handle_input(InputEvent::PlayPress);
        let out = play_for(&mut m, 2 * SR as usize);
        let hits = onsets(&out);
        assert_eq!(hits.len(), 1, "onsets {hits:?}");
        assert!(hits[0] < 16);
        assert_eq!(m.display_state().playhead, 0);
    }

    #[test]
    fn muted_track_stays_silent_while_playing() {
        let mut pattern = Pattern::default();
        for step in 0..STEPS {
            pattern.set_active(InstrumentKind::Snare, step, true);
        }
        let mut m = middle(pattern);
        m.handle_input(InputEvent::ToggleMute); // cursor starts on the kick row
        m.handle_input(InputEvent::MoveCursor { rows: 1, steps: 0 });
        m.handle_input(InputEvent::ToggleMute);
        m.handle_input(InputEvent::PlayPress);
        let out = play_for(&mut m, SR as usize);
        assert!(out.iter().all(|f| f.peak() == 0.0));
    }

    #[test]
    fn clear_resets_the_playhead() {
        let mut pattern = Pattern::default();
        pattern.set_active(InstrumentKind::HiHat, 3, true);
        let mut m = middle(pattern);
        m.handle_input(InputEvent::PlayPress);
        play_for(&mut m, SR as usize / 2);
        assert_ne!(m.display_state().playhead, 0);
        m.handle_input(InputEvent::Clear);
        assert_eq!(m.display_state().playhead, 0);
        assert!(m.pattern().grid.iter().flatten().all(|on| !on));
    }

    #[test]
    fn cursor_wraps_around_the_grid() {
        let mut m = middle(Pattern::default());
        m.handle_input(InputEvent::MoveCursor { rows: -1, steps: -1 });
        let ds = m.display_state();
        assert_eq!((ds.cursor_row, ds.cursor_step), (NUM_INSTRUMENTS - 1, STEPS - 1));
        m.handle_input(InputEvent::ToggleCell);
        assert!(m.pattern().is_active(InstrumentKind::Lead, STEPS - 1));
    }

    #[test]
    fn knobs_stay_in_range() {
        let mut m = middle(Pattern::default());
        for _ in 0..30 {
            m.handle_input(InputEvent::AdjustParam(0.1));
        }
        assert_eq!(m.display_state().param_value, 1.0);
        for _ in 0..4 {
            m.handle_input(InputEvent::NextParam);
        }
        assert_eq!(m.display_state().param, ParamKind::Cutoff);
        for _ in 0..30 {
            m.handle_input(InputEvent::AdjustParam(-0.1));
        }
        assert_eq!(m.display_state().param_value, 20.0);
    }

    fn select_param(m: &mut Middle, param: ParamKind) {
        while m.display_state().param != param {
            m.handle_input(InputEvent::NextParam);
        }
    }

    #[test]
    fn effect_knobs_have_their_own_ranges() {
        let mut m = middle(Pattern::default());
        select_param(&mut m, ParamKind::Resonance);
        for _ in 0..40 {
            m.handle_input(InputEvent::AdjustParam(0.1));
        }
        assert_eq!(m.display_state().param_value, 20.0);
        select_param(&mut m, ParamKind::DelayFeedback);
        for _ in 0..40 {
            m.handle_input(InputEvent::AdjustParam(0.1));
        }
        assert_eq!(m.display_state().param_value, 0.9);
        assert_eq!(m.pattern().track(InstrumentKind::Kick).effects.delay_feedback, 0.9);
    }

    #[test]
    fn delay_knob_reaches_the_audio() {
        let echo_window = |turn_knob: bool| {
            let mut pattern = Pattern::default();
            pattern.track_mut(InstrumentKind::Kick).synth.decay = 0.0; // 0.2 s kick
            let mut m = middle(pattern);
            if turn_knob {
                select_param(&mut m, ParamKind::DelayTime);
                for _ in 0..10 {
                    m.handle_input(InputEvent::AdjustParam(0.05));
                }
            }
            m.handle_input(InputEvent::Audition);
            let out = play_for(&mut m, SR as usize);
            let from = (0.52 * SR) as usize;
            let to = (0.68 * SR) as usize;
            out[from..to].iter().fold(0.0f32, |acc, f| acc.max(f.peak()))
        };
        assert_eq!(echo_window(false), 0.0);
        assert!(echo_window(true) > 0.01);
    }

    #[test]
    fn generate_writes_a_bar_with_melodies() {
        let mut m = middle(Pattern::default());
        m.handle_input(InputEvent::Generate);
        let p = m.pattern();
        assert!(p.is_active(InstrumentKind::Kick, 0));
        assert!(p.is_active(InstrumentKind::Snare, 12));
        for step in 0..STEPS {
            if p.is_active(InstrumentKind::Bass, step) {
                assert!(p.triggers(step).any(|t| t.kind == InstrumentKind::Bass && t.frequency.is_some()));
            }
        }
        assert_eq!(m.display_state().pattern_name, "Generative Classic");
        m.handle_input(InputEvent::ToggleCell);
        assert_eq!(m.display_state().pattern_name, "");
    }

    #[test]
    fn presets_cycle_and_set_the_tempo() {
        let mut m = middle(Pattern::default());
        m.handle_input(InputEvent::NextPreset);
        let ds = m.display_state();
        assert_eq!((ds.pattern_name, ds.bpm), ("Classic House", 124.0));
        m.handle_input(InputEvent::NextPreset);
        assert_eq!(m.display_state().bpm, 90.0);
        // four more wraps around to the same one
        for _ in 0..4 {
            m.handle_input(InputEvent::NextPreset);
        }
        assert_eq!(m.display_state().pattern_name, "Hip Hop Basic");
    }

    #[test]
    fn randomize_track_only_touches_the_selected_row() {
        let mut m = middle(Pattern::default());
        m.handle_input(InputEvent::MoveCursor { rows: 2, steps: 0 }); // hihat
        m.handle_input(InputEvent::RandomizeTrack);
        let p = m.pattern();
        assert!(p.track(InstrumentKind::HiHat).synth.tone >= 0.7);
        assert_eq!(*p.track(InstrumentKind::Kick), gridsynth::TrackSettings::default());
    }

    #[test]
    fn bpm_keys_are_bounded() {
        let mut m = middle(Pattern::default());
        for _ in 0..100 {
            m.handle_input(InputEvent::BpmUp);
        }
        assert_eq!(m.display_state().bpm, MAX_BPM);
        for _ in 0..100 {
            m.handle_input(InputEvent::BpmDown);
        }
        assert_eq!(m.display_state().bpm, MIN_BPM);
    }
}
