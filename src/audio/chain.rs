// One persistent effect chain per instrument:
//
//   input -> shaper -> filter -+-> delay (feedback) -+-> dry sum -+-> volume -> out
//                              +---------------------+            |
//                                                    reverb wet --+
//
// The chain never goes away; settings mutate it in place.

use std::sync::Arc;

use crate::pipeline::settings::EffectSettings;

use super::delay::FeedbackDelay;
use super::effect::{DRIVE_SCALE, Waveshaper};
use super::filter::{BiquadFilter, FilterType};
use super::frame::StereoFrame;
use super::reverb::{Convolver, ReverbKernel};

const DARK_BELOW_HZ: f32 = 1000.0;
const OPEN_ABOVE_HZ: f32 = 15000.0;

/// Filter mode for a cutoff. Very high cutoffs switch to an all-pass so the
/// filter gets out of the way instead of ringing near Nyquist.
pub fn filter_mode(cutoff: f32) -> FilterType {
    if cutoff < DARK_BELOW_HZ {
        FilterType::Lowpass
    } else if cutoff > OPEN_ABOVE_HZ {
        FilterType::Allpass
    } else {
        FilterType::Lowpass
    }
}

pub struct TrackChain {
    shaper: Waveshaper,
    filter: BiquadFilter,
    delay: FeedbackDelay,
    reverb: Convolver,
    wet: f32,
    volume: f32,
}

impl TrackChain {
    pub fn new(sample_rate: f32, curve_len: usize, kernel: Arc<ReverbKernel>) -> Self {
        let mut chain = Self {
            shaper: Waveshaper::new(curve_len),
            filter: BiquadFilter::new(FilterType::Lowpass, sample_rate),
            delay: FeedbackDelay::new(sample_rate),
            reverb: Convolver::new(kernel),
            wet: 0.0,
            volume: 0.0,
        };
        chain.apply_settings(&EffectSettings::default());
        chain
    }

    pub fn apply_settings(&mut self, s: &EffectSettings) {
        self.shaper.set_amount(s.distortion * DRIVE_SCALE);
        self.filter.set_frequency(s.filter_freq);
        self.filter.set_q(s.filter_res);
        self.filter.set_type(filter_mode(s.filter_freq));
        self.delay.set_time(s.delay_time);
        self.delay.set_feedback(s.delay_feedback);
        self.wet = finite_or_zero(s.reverb_mix);
        self.volume = finite_or_zero(s.volume);
        self.reverb.set_enabled(self.wet != 0.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    pub fn filter(&self) -> &BiquadFilter {
        &self.filter
    }

    pub fn shaper(&self) -> &Waveshaper {
        &self.shaper
    }

    pub fn delay(&self) -> &FeedbackDelay {
        &self.delay
    }

    /// Run `input` (the track's summed voices) through the chain, adding the
    /// result into `out`. The two slices must be the same length.
    pub fn process(&mut self, input: &[f32], out: &mut [StereoFrame]) {
        debug_assert_eq!(input.len(), out.len());
        for (x, o) in input.iter().zip(out.iter_mut()) {
            let shaped = self.shaper.process(*x);
            let filtered = self.filter.process(shaped);
            let echoed = self.delay.process(filtered);
            let dry = filtered + echoed;
            let (wet_l, wet_r) = self.reverb.process(dry);
            o.left += (dry + wet_l * self.wet) * self.volume;
            o.right += (dry + wet_r * self.wet) * self.volume;
        }
    }
}

fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn tiny_kernel() -> Arc<ReverbKernel> {
        let mut taps = vec![0.0f32; 64];
        taps[0] = 0.5;
        taps[40] = 0.25;
        Arc::new(ReverbKernel::with_scale(&taps, &taps, 32, 1.0).unwrap())
    }

    fn chain() -> TrackChain {
        TrackChain::new(SR, 1024, tiny_kernel())
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut x = vec![0.0; len];
        x[0] = 0.5;
        x
    }

    #[test]
    fn filter_mode_bands() {
        assert_eq!(filter_mode(200.0), FilterType::Lowpass);
        assert_eq!(filter_mode(999.9), FilterType::Lowpass);
        assert_eq!(filter_mode(5000.0), FilterType::Lowpass);
        assert_eq!(filter_mode(15000.0), FilterType::Lowpass);
        assert_eq!(filter_mode(15000.1), FilterType::Allpass);
        assert_eq!(filter_mode(20000.0), FilterType::Allpass);
    }

    #[test]
    fn starts_from_default_settings() {
        let c = chain();
        assert_eq!(c.volume(), 0.8);
        assert_eq!(c.wet(), 0.0);
        assert_eq!(c.shaper().amount(), 0.0);
        assert_eq!(c.filter().filter_type(), FilterType::Allpass);
    }

    #[test]
    fn apply_settings_reaches_every_stage() {
        let mut c = chain();
        c.apply_settings(&EffectSettings {
            distortion: 0.5,
            filter_freq: 800.0,
            filter_res: 3.0,
            delay_time: 0.25,
            delay_feedback: 0.9,
            reverb_mix: 0.3,
            volume: 0.5,
        });
        assert_eq!(c.shaper().amount(), 200.0);
        assert_eq!(c.filter().filter_type(), FilterType::Lowpass);
        assert_eq!(c.filter().frequency(), 800.0);
        assert_eq!(c.delay().delay_samples(), 11025);
        assert!((c.delay().feedback() - 0.9).abs() < 1e-6);
        assert_eq!(c.wet(), 0.3);
        assert_eq!(c.volume(), 0.5);
    }

    #[test]
    fn silent_input_stays_silent() {
        let mut c = chain();
        let input = vec![0.0; 512];
        let mut out = vec![StereoFrame::zero(); 512];
        c.process(&input, &mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn zero_volume_mutes_the_chain() {
        let mut c = chain();
        c.apply_settings(&EffectSettings { volume: 0.0, ..Default::default() });
        let input = impulse(256);
        let mut out = vec![StereoFrame::zero(); 256];
        c.process(&input, &mut out);
        assert!(out.iter().all(|f| f.peak() == 0.0));
    }

    #[test]
    fn delay_echo_is_part_of_the_dry_sum() {
        let mut c = chain();
        c.apply_settings(&EffectSettings {
            delay_time: 100.0 / SR,
            delay_feedback: 0.5,
            volume: 1.0,
            ..Default::default()
        });
        let input = impulse(400);
        let mut out = vec![StereoFrame::zero(); 400];
        c.process(&input, &mut out);
        // energy around each tap; the 20 kHz all-pass flips the sign but keeps the level
        let energy = |from: usize, to: usize| -> f32 { out[from..to].iter().map(|f| f.left * f.left).sum() };
        let direct = energy(0, 50);
        let first = energy(100, 150);
        let second = energy(200, 250);
        assert!(direct > 0.0);
        assert!((first / direct - 1.0).abs() < 0.05, "first echo ratio {}", first / direct);
        assert!((second / direct - 0.25).abs() < 0.02, "second echo ratio {}", second / direct);
        assert!(out.iter().all(|f| f.left == f.right));
    }

    #[test]
    fn wet_mix_adds_the_reverb_return() {
        let mut dry_chain = chain();
        let mut wet_chain = chain();
        let settings = EffectSettings { volume: 1.0, reverb_mix: 1.0, ..Default::default() };
        wet_chain.apply_settings(&settings);
        dry_chain.apply_settings(&EffectSettings { reverb_mix: 0.0, ..settings });

        let input = impulse(256);
        let mut dry = vec![StereoFrame::zero(); 256];
        let mut wet = vec![StereoFrame::zero(); 256];
        dry_chain.process(&input, &mut dry);
        wet_chain.process(&input, &mut wet);

        // identical until the convolver's one-partition latency has passed
        assert_eq!(&dry[..32], &wet[..32]);
        let diff: f32 = dry.iter().zip(&wet).map(|(d, w)| (d.left - w.left).abs()).sum();
        assert!(diff > 0.1);
    }

    #[test]
    fn process_accumulates_into_the_output() {
        let mut c = chain();
        let input = impulse(64);
        let mut out = vec![StereoFrame::mono(1.0); 64];
        c.process(&input, &mut out);
        assert!(out[63].left > 0.9);
    }
}
