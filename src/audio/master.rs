// Master bus: every chain sums in here, goes through one gain stage and
// the compressor, then out to the device. There is no bypass.

use super::compressor::Compressor;
use super::frame::StereoFrame;

pub const MASTER_GAIN: f32 = 0.8;
pub const COMPRESSOR_THRESHOLD_DB: f32 = -12.0;
pub const COMPRESSOR_RATIO: f32 = 12.0;
const COMPRESSOR_KNEE_DB: f32 = 30.0;
const COMPRESSOR_ATTACK: f32 = 0.003;
const COMPRESSOR_RELEASE: f32 = 0.25;

pub struct MasterBus {
    gain: f32,
    compressor: Compressor,
}

impl MasterBus {
    pub fn new(sample_rate: f32, gain: f32, threshold_db: f32, ratio: f32) -> Self {
        Self {
            gain,
            compressor: Compressor::with_params(
                sample_rate,
                threshold_db,
                ratio,
                COMPRESSOR_KNEE_DB,
                COMPRESSOR_ATTACK,
                COMPRESSOR_RELEASE,
            ),
        }
    }

    // in place: the summed track mix in, the device-ready signal out
    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let (l, r) = self
                .compressor
                .process(f.left * self.gain, f.right * self.gain);
            // the device gets a hard ceiling no matter what slipped past the detector
            f.left = sanitize(l);
            f.right = sanitize(r);
        }
    }

    #[cfg(test)]
    fn gain_reduction_db(&self) -> f32 {
        self.compressor.gain_reduction()
    }
}

#[inline]
fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 }
}
