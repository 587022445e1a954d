use serde::{Deserialize, Serialize};

use crate::audio::{
    COMPRESSOR_RATIO, COMPRESSOR_THRESHOLD_DB, DEFAULT_CURVE_LEN, DEFAULT_PARTITION,
    IMPULSE_SECONDS, MASTER_GAIN,
};
use crate::error::EngineError;

/// Engine tuning. Every field is optional in JSON; missing ones keep the
/// defaults, which reproduce the reference sound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Rate used for offline rendering. A device picks its own.
    pub sample_rate: u32,
    /// Entries in each track's distortion table.
    pub curve_resolution: usize,
    pub impulse_seconds: f32,
    /// Reverb FFT partition; also the wet path's latency in frames.
    pub reverb_partition: usize,
    /// Pending commands the audio thread will hold before sends fail.
    pub queue_capacity: usize,
    /// How far ahead of the clock the sequencer commits steps.
    pub lookahead_ms: f32,
    pub master_gain: f32,
    pub compressor_threshold_db: f32,
    pub compressor_ratio: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            curve_resolution: DEFAULT_CURVE_LEN,
            impulse_seconds: IMPULSE_SECONDS,
            reverb_partition: DEFAULT_PARTITION,
            queue_capacity: 1024,
            lookahead_ms: 100.0,
            master_gain: MASTER_GAIN,
            compressor_threshold_db: COMPRESSOR_THRESHOLD_DB,
            compressor_ratio: COMPRESSOR_RATIO,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidArgument(format!("engine config: {e}")))
    }
}
