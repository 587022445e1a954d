// Generative helpers: a "classic" bar with pentatonic bass and lead lines,
// per-instrument sound randomisation, and a handful of fixed preset bars.
// Everything takes the rng from the caller so tests can seed it.

use rand::Rng;

use crate::pipeline::pattern::{GridState, Pattern};
use crate::pipeline::settings::{EffectSettings, TrackSettings};
use crate::shared::{InstrumentKind, STEPS};

/// A minor pentatonic, A1..G2.
pub const SCALE_BASS: [f32; 5] = [55.0, 65.41, 73.42, 82.41, 98.0];
/// A minor pentatonic from A3, up to A4.
pub const SCALE_LEAD: [f32; 7] = [220.0, 246.94, 261.63, 293.66, 329.63, 392.0, 440.0];

/// Replace the grid and melodies with a generated bar: four-on-the-floor
/// kick, backbeat snare, straight hats, and random-walk bass and lead lines
/// on the scales above. Track settings are left alone.
pub fn generate_pattern<R: Rng + ?Sized>(pattern: &mut Pattern, rng: &mut R) {
    pattern.clear();

    for step in (0..STEPS).step_by(4) {
        pattern.set_active(InstrumentKind::Kick, step, true);
    }
    if rng.random_bool(0.5) {
        pattern.set_active(InstrumentKind::Kick, 10, true);
    }

    pattern.set_active(InstrumentKind::Snare, 4, true);
    pattern.set_active(InstrumentKind::Snare, 12, true);

    // 8ths or 16ths
    let hat_every = if rng.random_bool(0.5) { 2 } else { 1 };
    for step in (0..STEPS).step_by(hat_every) {
        pattern.set_active(InstrumentKind::HiHat, step, true);
    }

    let mut note = rng.random_range(0..SCALE_BASS.len());
    for step in 0..STEPS {
        if rng.random_bool(0.3) {
            if rng.random_bool(0.4) {
                note = walk(note, SCALE_BASS.len(), rng);
            }
            pattern.set_active(InstrumentKind::Bass, step, true);
            pattern.set_melody(InstrumentKind::Bass, step, SCALE_BASS[note]);
        }
    }

    // the lead always moves a scale step between notes
    let mut note = rng.random_range(0..SCALE_LEAD.len());
    for step in 0..STEPS {
        if rng.random_bool(0.25) {
            note = walk(note, SCALE_LEAD.len(), rng);
            pattern.set_active(InstrumentKind::Lead, step, true);
            pattern.set_melody(InstrumentKind::Lead, step, SCALE_LEAD[note]);
        }
    }
}

// one step up or down, wrapping around the scale
fn walk<R: Rng + ?Sized>(idx: usize, len: usize, rng: &mut R) -> usize {
    if rng.random_bool(0.5) { (idx + 1) % len } else { (idx + len - 1) % len }
}

/// Re-roll the synth knobs and the instrument-relevant effects of one track,
/// inside ranges that still sound like that instrument.
pub fn randomize_track<R: Rng + ?Sized>(kind: InstrumentKind, track: &mut TrackSettings, rng: &mut R) {
    let synth = &mut track.synth;
    let fx = &mut track.effects;
    let mut r = |lo: f32, span: f32| lo + rng.random::<f32>() * span;
    match kind {
        InstrumentKind::Kick => {
            synth.tone = r(0.1, 0.4);
            synth.decay = r(0.3, 0.5);
            synth.punch = r(0.5, 0.5);
            synth.timbre = r(0.0, 0.4);
            fx.filter_freq = r(800.0, 4000.0);
            fx.distortion = r(0.0, 0.2);
        }
        InstrumentKind::Bass => {
            synth.tone = r(0.0, 0.3);
            synth.decay = r(0.2, 0.6);
            synth.punch = r(0.3, 0.7);
            // square or saw, nothing in between
            synth.timbre = if r(0.0, 1.0) > 0.5 { 0.2 } else { 0.8 };
            fx.filter_freq = r(150.0, 1000.0);
            fx.distortion = r(0.0, 0.3);
        }
        InstrumentKind::Snare | InstrumentKind::Clap => {
            synth.tone = r(0.4, 0.4);
            synth.decay = r(0.1, 0.3);
            synth.punch = r(0.4, 0.6);
            synth.timbre = r(0.3, 0.5);
            fx.filter_freq = r(1500.0, 6000.0);
            fx.distortion = r(0.0, 0.4);
        }
        InstrumentKind::HiHat => {
            synth.tone = r(0.7, 0.3);
            synth.decay = r(0.05, 0.2);
            synth.punch = r(0.4, 0.6);
            synth.timbre = r(0.5, 0.5);
            fx.filter_freq = r(5000.0, 10000.0);
            fx.distortion = 0.0;
        }
        InstrumentKind::Lead => {
            synth.tone = r(0.2, 0.6);
            synth.decay = r(0.3, 0.7);
            synth.punch = r(0.0, 0.5);
            synth.timbre = r(0.0, 1.0);
            fx.filter_freq = r(2000.0, 8000.0);
            fx.reverb_mix = r(0.2, 0.5);
        }
    }
}

/// Re-roll the effect sends. Volume is kept; distortion and delay are
/// only switched on some of the time.
pub fn randomize_effects<R: Rng + ?Sized>(fx: &mut EffectSettings, rng: &mut R) {
    fx.filter_freq = 500.0 + rng.random::<f32>() * 14000.0;
    fx.filter_res = rng.random::<f32>() * 8.0;
    fx.distortion = if rng.random_bool(0.3) { rng.random::<f32>() * 0.4 } else { 0.0 };
    fx.delay_time = if rng.random_bool(0.4) { rng.random::<f32>() * 0.3 } else { 0.0 };
    fx.delay_feedback = rng.random::<f32>() * 0.4;
    fx.reverb_mix = rng.random::<f32>() * 0.5;
}

pub struct Preset {
    pub name: &'static str,
    pub bpm: f32,
    pub grid: GridState,
}

impl Preset {
    /// Load the bar into `pattern`. Melodies are cleared so every voice
    /// plays at its own pitch; track settings stay.
    pub fn apply(&self, pattern: &mut Pattern) {
        pattern.clear();
        pattern.grid = self.grid;
    }
}

const fn row(steps: [u8; STEPS]) -> [bool; STEPS] {
    let mut out = [false; STEPS];
    let mut i = 0;
    while i < STEPS {
        out[i] = steps[i] != 0;
        i += 1;
    }
    out
}

// rows: kick, snare, hihat, clap, bass, lead
pub static PRESETS: [Preset; 4] = [
    Preset {
        name: "Classic House",
        bpm: 124.0,
        grid: [
            row([1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]),
            row([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
            row([0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0]),
            row([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
            row([0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
            row([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0]),
        ],
    },
    Preset {
        name: "Hip Hop Basic",
        bpm: 90.0,
        grid: [
            row([1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0]),
            row([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
            row([1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0]),
            row([0; STEPS]),
            row([1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
            row([0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]),
        ],
    },
    Preset {
        name: "Techno Rumble",
        bpm: 135.0,
        grid: [
            row([1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]),
            row([0; STEPS]),
            row([0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0]),
            row([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
            row([0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0]),
            row([0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0]),
        ],
    },
    Preset {
        name: "DnB Stepper",
        bpm: 174.0,
        grid: [
            row([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0]),
            row([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
            row([1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0]),
            row([0; STEPS]),
            row([1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
            row([0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0]),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn generated_bar_has_the_fixed_drums() {
        for seed in 0..20 {
            let mut p = Pattern::default();
            generate_pattern(&mut p, &mut SmallRng::seed_from_u64(seed));
            for step in [0, 4, 8, 12] {
                assert!(p.is_active(InstrumentKind::Kick, step));
            }
            assert!(p.is_active(InstrumentKind::Snare, 4));
            assert!(p.is_active(InstrumentKind::Snare, 12));
            assert_eq!(p.grid[InstrumentKind::Snare.index()].iter().filter(|on| **on).count(), 2);
            assert!((0..STEPS).step_by(2).all(|s| p.is_active(InstrumentKind::HiHat, s)));
            assert!((0..STEPS).all(|s| !p.is_active(InstrumentKind::Clap, s)));
        }
    }

    #[test]
    fn melodic_steps_carry_scale_pitches() {
        let mut any_bass = false;
        for seed in 0..20 {
            let mut p = Pattern::default();
            generate_pattern(&mut p, &mut SmallRng::seed_from_u64(seed));
            for step in 0..STEPS {
                let bass = p.melodies[InstrumentKind::Bass.index()][step];
                let lead = p.melodies[InstrumentKind::Lead.index()][step];
                // a pitch exactly where a cell is on
                assert_eq!(bass > 0.0, p.is_active(InstrumentKind::Bass, step));
                assert_eq!(lead > 0.0, p.is_active(InstrumentKind::Lead, step));
                if bass > 0.0 {
                    any_bass = true;
                    assert!(SCALE_BASS.contains(&bass));
                }
                if lead > 0.0 {
                    assert!(SCALE_LEAD.contains(&lead));
                }
            }
        }
        assert!(any_bass);
    }

    #[test]
    fn generated_triggers_reach_the_frequency_override() {
        let mut p = Pattern::default();
        let mut rng = SmallRng::seed_from_u64(3);
        // keep rolling until the lead has a note
        while p.grid[InstrumentKind::Lead.index()].iter().all(|on| !on) {
            generate_pattern(&mut p, &mut rng);
        }
        let step = (0..STEPS).find(|s| p.is_active(InstrumentKind::Lead, *s)).unwrap();
        let trig = p.triggers(step).find(|t| t.kind == InstrumentKind::Lead).unwrap();
        assert!(SCALE_LEAD.contains(&trig.frequency.unwrap()));
    }

    #[test]
    fn generating_keeps_track_settings() {
        let mut p = Pattern::default();
        p.track_mut(InstrumentKind::Lead).effects.reverb_mix = 0.7;
        p.toggle_mute(InstrumentKind::Bass);
        generate_pattern(&mut p, &mut SmallRng::seed_from_u64(9));
        assert_eq!(p.track(InstrumentKind::Lead).effects.reverb_mix, 0.7);
        assert!(p.track(InstrumentKind::Bass).muted);
    }

    #[test]
    fn randomized_sounds_stay_in_their_ranges() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..200 {
            let mut hat = TrackSettings::default();
            randomize_track(InstrumentKind::HiHat, &mut hat, &mut rng);
            assert!((0.7..=1.0).contains(&hat.synth.tone));
            assert!((5000.0..=15000.0).contains(&hat.effects.filter_freq));
            assert_eq!(hat.effects.distortion, 0.0);

            let mut bass = TrackSettings::default();
            randomize_track(InstrumentKind::Bass, &mut bass, &mut rng);
            assert!(bass.synth.timbre == 0.2 || bass.synth.timbre == 0.8);
            assert!((150.0..=1150.0).contains(&bass.effects.filter_freq));
            // untouched fields survive
            assert_eq!(bass.effects.volume, EffectSettings::default().volume);
        }
    }

    #[test]
    fn randomized_effects_stay_in_their_ranges() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut delays_on = 0;
        for _ in 0..200 {
            let mut fx = EffectSettings { volume: 0.3, ..Default::default() };
            randomize_effects(&mut fx, &mut rng);
            assert!((500.0..=14500.0).contains(&fx.filter_freq));
            assert!((0.0..=8.0).contains(&fx.filter_res));
            assert!((0.0..=0.4).contains(&fx.distortion));
            assert!((0.0..=0.3).contains(&fx.delay_time));
            assert!((0.0..=0.5).contains(&fx.reverb_mix));
            assert_eq!(fx.volume, 0.3);
            if fx.delay_time > 0.0 {
                delays_on += 1;
            }
        }
        assert!(delays_on > 0 && delays_on < 200);
    }

    #[test]
    fn presets_load_their_grid_and_clear_melodies() {
        let mut p = Pattern::default();
        p.set_melody(InstrumentKind::Bass, 0, 55.0);
        let house = &PRESETS[0];
        house.apply(&mut p);
        assert_eq!(house.bpm, 124.0);
        assert!(p.is_active(InstrumentKind::Kick, 0));
        assert!(p.is_active(InstrumentKind::Lead, 14));
        assert!(!p.is_active(InstrumentKind::Kick, 1));
        assert!(p.melodies.iter().flatten().all(|f| *f == 0.0));
        assert!(PRESETS.iter().all(|pr| pr.grid[InstrumentKind::Kick.index()][0]));
    }
}
