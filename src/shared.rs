// Constants and the instrument vocabulary shared by the audio side and the
// sequencing side. Nothing in here touches the audio thread directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const STEPS: usize = 16; // one bar of 16th notes
pub const NUM_INSTRUMENTS: usize = 6;
pub const DEFAULT_BPM: f32 = 120.0;

/// The six fixed engine slots. Each kind is bound to exactly one synthesis
/// algorithm and one effect chain for the lifetime of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Kick,
    Snare,
    HiHat,
    Clap,
    Bass,
    Lead,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; NUM_INSTRUMENTS] = [
        InstrumentKind::Kick,
        InstrumentKind::Snare,
        InstrumentKind::HiHat,
        InstrumentKind::Clap,
        InstrumentKind::Bass,
        InstrumentKind::Lead,
    ];

    // slot index into chain and voice tables
    pub fn index(self) -> usize {
        match self {
            InstrumentKind::Kick => 0,
            InstrumentKind::Snare => 1,
            InstrumentKind::HiHat => 2,
            InstrumentKind::Clap => 3,
            InstrumentKind::Bass => 4,
            InstrumentKind::Lead => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InstrumentKind::Kick => "KICK",
            InstrumentKind::Snare => "SNARE",
            InstrumentKind::HiHat => "HI-HAT",
            InstrumentKind::Clap => "CLAP",
            InstrumentKind::Bass => "BASS",
            InstrumentKind::Lead => "LEAD",
        }
    }

    /// Only the melodic voices honour a per-step frequency override.
    pub fn is_melodic(self) -> bool {
        matches!(self, InstrumentKind::Bass | InstrumentKind::Lead)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstrumentKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kick" => Ok(InstrumentKind::Kick),
            "snare" => Ok(InstrumentKind::Snare),
            "hihat" | "hi-hat" => Ok(InstrumentKind::HiHat),
            "clap" => Ok(InstrumentKind::Clap),
            "bass" => Ok(InstrumentKind::Bass),
            "lead" => Ok(InstrumentKind::Lead),
            other => Err(EngineError::InvalidArgument(format!("unknown instrument '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_index_follows_all_order() {
        for (i, kind) in InstrumentKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn only_bass_and_lead_are_melodic() {
        let melodic: Vec<_> = InstrumentKind::ALL.into_iter().filter(|k| k.is_melodic()).collect();
        assert_eq!(melodic, vec![InstrumentKind::Bass, InstrumentKind::Lead]);
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("Hi-Hat".parse::<InstrumentKind>().unwrap(), InstrumentKind::HiHat);
        assert_eq!("LEAD".parse::<InstrumentKind>().unwrap(), InstrumentKind::Lead);
        assert!("cowbell".parse::<InstrumentKind>().is_err());
    }
}
