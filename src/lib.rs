pub mod audio;
pub mod audio_api;
pub mod audio_engine;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod shared;

pub use audio_engine::AudioEngine;
pub use config::EngineConfig;
pub use error::EngineError;
pub use pipeline::pattern::{GridState, Pattern, StepTrigger};
pub use pipeline::sequencer::{Sequencer, Tick, TransportState, step_duration_ms};
pub use pipeline::settings::{EffectSettings, SynthParams, TrackSettings};
pub use shared::{InstrumentKind, STEPS};
