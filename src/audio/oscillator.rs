//! Band-limited oscillators (PolyBLEP) driven by a per-sample frequency.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f32, // [0, 1)
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Produce one sample at `freq` Hz and advance the phase.
    pub fn next_sample(&mut self, freq: f32) -> f32 {
        // a negative or NaN frequency just stalls the phase
        let inc = if freq.is_finite() {
            (freq / self.sample_rate).clamp(0.0, 0.5)
        } else {
            0.0
        };
        let sample = match self.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

// Polynomial band-limited step correction around the wrap discontinuity.
// `t` is the phase in [0, 1), `dt` the phase increment.
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
