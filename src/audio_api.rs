pub use crate::audio::Voice;
use crate::pipeline::settings::EffectSettings;
use crate::shared::InstrumentKind;

pub struct TriggerParams {
    pub kind: InstrumentKind,
    // built on the control thread, the audio thread only renders it
    pub voice: Voice,
    // absolute frame on the sample clock; None plays at the next block
    pub at: Option<u64>,
}

pub enum AudioCommand {
    // Settings land at the start of the next block and stay until replaced
    ApplySettings {
        kind: InstrumentKind,
        settings: EffectSettings,
    },

    Trigger(TriggerParams),
}
