//! Feed-forward dynamics compressor for the master bus.
//!
//! Peak envelope follower with separate attack/release, soft knee gain
//! computer. Parameters default to the usual browser compressor settings.

#[derive(Debug, Clone)]
pub struct Compressor {
    /// Threshold in dB.
    pub threshold: f32,
    /// Compression ratio (12.0 = 12:1).
    pub ratio: f32,
    /// Knee width in dB (0 = hard knee).
    pub knee: f32,

    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl Compressor {
    pub fn with_params(
        sample_rate: f32,
        threshold: f32,
        ratio: f32,
        knee: f32,
        attack: f32,
        release: f32,
    ) -> Self {
        Self {
            threshold: threshold.clamp(-100.0, 0.0),
            ratio: ratio.clamp(1.0, 20.0),
            knee: knee.clamp(0.0, 40.0),
            attack_coef: time_coef(attack.clamp(0.0001, 1.0), sample_rate),
            release_coef: time_coef(release.clamp(0.001, 5.0), sample_rate),
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f32) -> f32 {
        if linear <= 1e-6 { -120.0 } else { 20.0 * linear.log10() }
    }

    #[inline]
    fn db_to_linear(db: f32) -> f32 {
        10.0f32.powf(db / 20.0)
    }

    /// Gain change in dB (<= 0) for a detector level in dB.
    fn gain_db(&self, input_db: f32) -> f32 {
        let slope = 1.0 - 1.0 / self.ratio;
        let half_knee = self.knee / 2.0;
        if self.knee <= 0.0 || input_db >= self.threshold + half_knee {
            (self.threshold - input_db).min(0.0) * slope
        } else if input_db <= self.threshold - half_knee {
            0.0
        } else {
            let x = input_db - (self.threshold - half_knee);
            -(x * x) / (2.0 * self.knee) * slope
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let level = left.abs().max(right.abs());
        let level = if level.is_finite() { level } else { 0.0 };
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain = Self::db_to_linear(self.gain_db(Self::linear_to_db(self.envelope)));
        (left * gain, right * gain)
    }

    /// Current gain reduction in dB, positive when compressing.
    pub fn gain_reduction(&self) -> f32 {
        -self.gain_db(Self::linear_to_db(self.envelope))
    }
}

fn time_coef(seconds: f32, sample_rate: f32) -> f32 {
    (-1.0 / (seconds * sample_rate)).exp()
}
