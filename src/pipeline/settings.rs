// The per-track parameter snapshot the caller hands to the engine.
// None of these are validated here: values are used as given and the DSP
// stages clip only where a hard limit exists.

use serde::{Deserialize, Serialize};

/// Four abstract synthesis knobs, each nominally in [0, 1]. What they mean
/// is up to the instrument: roughly pitch, length, attack intensity and colour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthParams {
    pub tone: f32,
    pub decay: f32,
    pub punch: f32,
    pub timbre: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            tone: 0.5,
            decay: 0.5,
            punch: 0.5,
            timbre: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSettings {
    pub distortion: f32,     // 0 - 1
    pub filter_freq: f32,    // 20 - 20000 Hz
    pub filter_res: f32,     // 0 - 20
    pub delay_time: f32,     // 0 - 1 s
    pub delay_feedback: f32, // 0 - 0.9
    pub reverb_mix: f32,     // 0 - 1
    pub volume: f32,         // 0 - 1
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            distortion: 0.0,
            filter_freq: 20000.0,
            filter_res: 0.0,
            delay_time: 0.0,
            delay_feedback: 0.0,
            reverb_mix: 0.0,
            volume: 0.8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub synth: SynthParams,
    pub effects: EffectSettings,
    pub muted: bool,
}
