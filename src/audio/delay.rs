//! Mono delay line with a feedback loop.
//!
//! The delay output is fed back into its own input through the feedback
//! gain. The gain is clipped just below unity so even a caller passing
//! values past the nominal 0.9 ceiling can't make the loop run away.

pub const MAX_DELAY_SECONDS: f32 = 1.0;
pub const MAX_FEEDBACK: f32 = 0.99;

#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
    feedback: f32,
    sample_rate: f32,
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32) -> Self {
        let len = (sample_rate * MAX_DELAY_SECONDS) as usize + 1;
        Self {
            buffer: vec![0.0; len.max(2)],
            write_pos: 0,
            delay_samples: 1,
            feedback: 0.0,
            sample_rate,
        }
    }

    /// Delay time in seconds; at least one sample, at most `MAX_DELAY_SECONDS`.
    pub fn set_time(&mut self, seconds: f32) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        let samples = (seconds * self.sample_rate).round().max(0.0) as usize;
        self.delay_samples = samples.clamp(1, self.buffer.len() - 1);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        let feedback = if feedback.is_finite() { feedback } else { 0.0 };
        self.feedback = feedback.clamp(-MAX_FEEDBACK, MAX_FEEDBACK);
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Push one input sample, returning the delayed (wet) output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        let read_pos = (self.write_pos + len - self.delay_samples) % len;
        let delayed = self.buffer[read_pos];
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % len;
        delayed
    }
}
