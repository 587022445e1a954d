pub mod generate;
pub mod pattern;
pub mod persistence;
pub mod sequencer;
pub mod settings;
