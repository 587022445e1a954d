//! The six instrument voices.
//!
//! Each builder is a pure function of the synth params (plus the optional
//! pitch override for the melodic voices) and returns the layer specs of one
//! voice. Times are seconds after the trigger. `voice_layers` picks the
//! builder with a total match, so a new `InstrumentKind` won't compile
//! until it has a voice.

use crate::pipeline::settings::SynthParams;
use crate::shared::InstrumentKind;

use super::filter::FilterType;
use super::oscillator::Waveform;
use super::param::Param;
use super::voice::{FilterSpec, LayerSpec, SourceSpec, Vibrato};

/// Envelopes ramp down to this fraction of their peak before the voice stops.
pub const NEAR_SILENCE: f32 = 0.001;

// Web-audio style biquads default to Q = 1 when nothing sets it
const DEFAULT_Q: f32 = 1.0;

pub fn voice_layers(kind: InstrumentKind, p: &SynthParams, frequency: Option<f32>) -> Vec<LayerSpec> {
    // 0, negative or NaN means "no override", same as an empty melody step
    let frequency = frequency.filter(|f| f.is_finite() && *f > 0.0);
    match kind {
        InstrumentKind::Kick => kick(p),
        InstrumentKind::Snare => snare(p),
        InstrumentKind::HiHat => hihat(p),
        InstrumentKind::Clap => clap(p),
        InstrumentKind::Bass => bass(p, frequency),
        InstrumentKind::Lead => lead(p, frequency),
    }
}

pub fn kick_length(p: &SynthParams) -> f32 {
    0.2 + p.decay * 0.8
}

pub fn kick(p: &SynthParams) -> Vec<LayerSpec> {
    let base = 40.0 + p.tone * 110.0;
    let drop = 50.0 + p.punch * 200.0;
    let len = kick_length(p);
    vec![LayerSpec {
        source: SourceSpec::Osc {
            waveform: if p.timbre > 0.5 { Waveform::Square } else { Waveform::Sine },
            freq: Param::constant(base + drop)
                .set(0.0, base + drop)
                .exponential_to(0.05 + p.decay * 0.1, base),
            vibrato: None,
        },
        filter: None,
        gain: Param::constant(1.0).set(0.0, 1.0).exponential_to(len, NEAR_SILENCE),
        stop: len,
    }]
}

pub fn snare(p: &SynthParams) -> Vec<LayerSpec> {
    let body = LayerSpec {
        source: SourceSpec::Osc {
            waveform: Waveform::Triangle,
            freq: Param::constant(150.0 + p.tone * 250.0),
            vibrato: None,
        },
        filter: None,
        gain: Param::constant(0.5)
            .set(0.0, 0.5)
            .exponential_to(0.1 + p.decay * 0.1, 0.01),
        stop: 0.2,
    };
    let noise_len = 0.1 + p.decay * 0.4;
    let level = 0.5 + p.punch * 0.5;
    let rattle = LayerSpec {
        source: SourceSpec::Noise,
        filter: Some(FilterSpec {
            kind: FilterType::Bandpass,
            freq: Param::constant(1000.0 + p.timbre * 6000.0),
            q: DEFAULT_Q,
        }),
        gain: Param::constant(level).set(0.0, level).exponential_to(noise_len, 0.01),
        stop: noise_len,
    };
    vec![body, rattle]
}

pub fn hihat(p: &SynthParams) -> Vec<LayerSpec> {
    let len = 0.05 + p.decay * 0.4;
    let peak = 0.6 * p.punch;
    vec![LayerSpec {
        source: SourceSpec::Osc {
            waveform: Waveform::Square,
            freq: Param::constant(400.0 + p.timbre * 600.0),
            vibrato: None,
        },
        filter: Some(FilterSpec {
            kind: FilterType::Highpass,
            freq: Param::constant(3000.0 + p.tone * 7000.0),
            q: DEFAULT_Q,
        }),
        gain: Param::constant(peak).set(0.0, peak).exponential_to(len, NEAR_SILENCE),
        stop: len,
    }]
}

/// The clap's three hand hits: up, dip, up, dip, up, then the tail.
pub fn clap_envelope(len: f32) -> Param {
    Param::constant(0.0)
        .set(0.0, 0.0)
        .linear_to(0.01, 1.0)
        .exponential_to(0.03, 0.1)
        .linear_to(0.04, 0.8)
        .exponential_to(0.06, 0.1)
        .linear_to(0.07, 1.0)
        .exponential_to(len, NEAR_SILENCE)
}

pub fn clap(p: &SynthParams) -> Vec<LayerSpec> {
    let len = 0.1 + p.decay * 0.4;
    vec![LayerSpec {
        source: SourceSpec::Noise,
        filter: Some(FilterSpec {
            kind: FilterType::Bandpass,
            freq: Param::constant(800.0 + p.tone * 3000.0),
            q: 1.0 + p.timbre * 5.0,
        }),
        gain: clap_envelope(len),
        stop: len,
    }]
}

pub fn bass(p: &SynthParams, frequency: Option<f32>) -> Vec<LayerSpec> {
    let freq = frequency.unwrap_or(30.0 + p.tone * 80.0);
    let len = 0.1 + p.decay * 1.4;
    vec![LayerSpec {
        source: SourceSpec::Osc {
            waveform: if p.timbre > 0.5 { Waveform::Sawtooth } else { Waveform::Square },
            freq: Param::constant(freq),
            vibrato: None,
        },
        filter: Some(FilterSpec {
            kind: FilterType::Lowpass,
            freq: Param::constant(freq * 4.0)
                .set(0.0, freq * 4.0)
                .exponential_to(0.1 + p.punch * 0.2, freq * 1.5),
            q: p.punch * 10.0,
        }),
        gain: Param::constant(0.8).set(0.0, 0.8).exponential_to(len, NEAR_SILENCE),
        stop: len,
    }]
}

pub fn lead_waveform(timbre: f32) -> Waveform {
    if timbre > 0.6 {
        Waveform::Sawtooth
    } else if timbre > 0.3 {
        Waveform::Square
    } else {
        Waveform::Triangle
    }
}

pub fn lead(p: &SynthParams, frequency: Option<f32>) -> Vec<LayerSpec> {
    let freq = frequency.unwrap_or(200.0 + p.tone * 600.0);
    let len = 0.1 + p.decay * 1.9;
    let vibrato = (p.punch > 0.3).then(|| Vibrato {
        rate: 5.0 + p.punch * 10.0,
        depth: 5.0 + p.punch * 20.0,
    });
    vec![LayerSpec {
        source: SourceSpec::Osc {
            waveform: lead_waveform(p.timbre),
            freq: Param::constant(freq),
            vibrato,
        },
        filter: None,
        // near-flat sustain for 80% of the note, then the release
        gain: Param::constant(0.4)
            .set(0.0, 0.4)
            .linear_to(len * 0.8, 0.4)
            .exponential_to(len, NEAR_SILENCE),
        stop: len,
    }]
}
