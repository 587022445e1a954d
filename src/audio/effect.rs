// Distortion stage: a waveshaper driven by a lookup curve.
// The curve maps input amplitude [-1, 1] onto output amplitude and is
// rebuilt in place whenever the drive amount changes, so no allocation
// happens after construction.

use std::f32::consts::PI;

pub const DEFAULT_CURVE_LEN: usize = 44100;
pub const DRIVE_SCALE: f32 = 400.0; // distortion knob [0, 1] -> curve amount

/// Fill `curve` with the transfer function for drive `amount`.
/// `amount == 0` is the identity line from -1 to 1, not the limit of the formula.
pub fn fill_distortion_curve(curve: &mut [f32], amount: f32) {
    let n = curve.len();
    if n < 2 {
        curve.fill(0.0);
        return;
    }
    if amount == 0.0 {
        for (i, c) in curve.iter_mut().enumerate() {
            *c = (i as f32 / (n - 1) as f32) * 2.0 - 1.0;
        }
        return;
    }
    let deg = PI / 180.0;
    for (i, c) in curve.iter_mut().enumerate() {
        let x = (i as f32 * 2.0) / n as f32 - 1.0;
        *c = ((3.0 + amount) * x * 20.0 * deg) / (PI + amount * x.abs());
    }
}

pub fn distortion_curve(amount: f32, len: usize) -> Vec<f32> {
    let mut curve = vec![0.0; len];
    fill_distortion_curve(&mut curve, amount);
    curve
}

pub struct Waveshaper {
    curve: Vec<f32>,
    amount: f32,
}

impl Waveshaper {
    pub fn new(len: usize) -> Self {
        Self {
            curve: distortion_curve(0.0, len.max(2)),
            amount: 0.0,
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    pub fn set_amount(&mut self, amount: f32) {
        // NaN would poison the whole table
        let amount = if amount.is_finite() { amount } else { 0.0 };
        if amount != self.amount {
            self.amount = amount;
            fill_distortion_curve(&mut self.curve, amount);
        }
    }

    // linear interpolation into the table; out-of-range input sticks to the ends
    #[inline]
    pub fn process(&self, x: f32) -> f32 {
        let last = self.curve.len() - 1;
        if self.amount == 0.0 && !x.is_nan() {
            // the identity table, without the rounding of the lookup
            return x.clamp(-1.0, 1.0);
        }
        if x.is_nan() || x <= -1.0 {
            return self.curve[0];
        }
        if x >= 1.0 {
            return self.curve[last];
        }
        let pos = (x + 1.0) * 0.5 * last as f32;
        let idx = pos as usize;
        if idx >= last {
            return self.curve[last];
        }
        let frac = pos - idx as f32;
        self.curve[idx] * (1.0 - frac) + self.curve[idx + 1] * frac
    }
}
