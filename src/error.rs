use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    // a value outside the closed vocabulary, e.g. an instrument slot that doesn't exist
    InvalidArgument(String),
    // the audio thread can't take any more work right now (command queue full)
    ResourceExhausted(String),
    // the output device could not be opened or started
    Device(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::ResourceExhausted(msg) => write!(f, "resource exhausted: {msg}"),
            EngineError::Device(msg) => write!(f, "audio device error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Device(format!("{e:#}"))
    }
}
