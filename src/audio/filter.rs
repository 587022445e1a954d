//! Biquad filter (RBJ cookbook coefficients, Direct Form II Transposed).
//!
//! Low-pass and high-pass take their resonance in dB, band-pass and
//! all-pass take a linear Q. Cutoff is clipped below Nyquist and a zero Q
//! falls back to the formulas' limit, so any caller input yields a stable
//! filter.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Allpass,
}

const MIN_FREQ: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct BiquadFilter {
    filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f32) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 350.0,
            q: 1.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate: sample_rate as f64,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    #[cfg(test)]
    fn with_params(filter_type: FilterType, sample_rate: f32, frequency: f32, q: f32) -> Self {
        let mut f = Self::new(filter_type, sample_rate);
        f.set_frequency(frequency);
        f.set_q(q);
        f.update_coefficients();
        f
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn frequency(&self) -> f32 {
        self.frequency as f32
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        if self.filter_type != filter_type {
            self.filter_type = filter_type;
            self.dirty = true;
        }
    }

    pub fn set_frequency(&mut self, freq: f32) {
        let nyquist = self.sample_rate * 0.5;
        let freq = if freq.is_finite() { freq as f64 } else { nyquist };
        let freq = freq.clamp(MIN_FREQ, nyquist * 0.999);
        if freq != self.frequency {
            self.frequency = freq;
            self.dirty = true;
        }
    }

    pub fn set_q(&mut self, q: f32) {
        let q = if q.is_finite() { q as f64 } else { 0.0 };
        if q != self.q {
            self.q = q;
            self.dirty = true;
        }
    }

    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let alpha = sin_w0 / 2.0 * 10f64.powf(-self.q / 20.0);
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let alpha = sin_w0 / 2.0 * 10f64.powf(-self.q / 20.0);
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            // Q -> 0 limits: band-pass degenerates to a wire, all-pass to an inverter
            FilterType::Bandpass if self.q <= 0.0 => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
            FilterType::Allpass if self.q <= 0.0 => (-1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
            FilterType::Bandpass => {
                let alpha = sin_w0 / (2.0 * self.q);
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Allpass => {
                let alpha = sin_w0 / (2.0 * self.q);
                (
                    1.0 - alpha,
                    -2.0 * cos_w0,
                    1.0 + alpha,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
        self.dirty = false;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        if self.dirty {
            self.update_coefficients();
        }
        let input = input as f64;
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output as f32
    }
}
