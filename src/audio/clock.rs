use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// Frames rendered so far, published by the audio thread after each block.
// Every other thread only reads it; it is the one clock the sequencer trusts.
#[derive(Clone, Debug, Default)]
pub struct SampleClock(Arc<AtomicU64>);

impl SampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, frames: u64) {
        self.0.store(frames, Ordering::Release);
    }
}
