// Synthetic stereo impulse response for the shared reverb kernel:
// white noise under a (1 - i/N)^4 decay, drawn independently per channel.

use rand::Rng;

pub const IMPULSE_SECONDS: f32 = 2.0;

#[derive(Clone, Debug)]
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: f32,
}

impl ImpulseResponse {
    pub fn generate<R: Rng + ?Sized>(sample_rate: f32, seconds: f32, rng: &mut R) -> Self {
        let len = (sample_rate * seconds).max(1.0) as usize;
        let mut left = Vec::with_capacity(len);
        let mut right = Vec::with_capacity(len);
        for i in 0..len {
            let decay = (1.0 - i as f32 / len as f32).powi(4);
            left.push(rng.random_range(-1.0f32..1.0) * decay);
            right.push(rng.random_range(-1.0f32..1.0) * decay);
        }
        Self {
            left,
            right,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}
