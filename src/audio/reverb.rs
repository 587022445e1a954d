//! Convolution reverb.
//!
//! Uniformly partitioned overlap-save: the impulse response is cut into
//! blocks of `partition` samples and transformed once (`ReverbKernel`, shared
//! between every chain through an `Arc`). Each `Convolver` keeps a
//! frequency-domain delay line of its recent input spectra and
//! multiply-accumulates it against the kernel once per block. The wet output
//! lags the input by exactly one partition.
//!
//! The kernel is scaled the way browser convolvers normalise an impulse
//! response, so a dense two-second noise tail comes out near unity loudness
//! instead of some 40 dB hot.

use std::sync::Arc;

use anyhow::Context;
use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::impulse::ImpulseResponse;

pub const DEFAULT_PARTITION: usize = 512;

const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Loudness normalisation for an impulse response.
pub fn normalization_scale(ir: &ImpulseResponse) -> f32 {
    let n = (ir.left.len() + ir.right.len()) as f32;
    if n == 0.0 {
        return 1.0;
    }
    let energy: f32 = ir.left.iter().chain(&ir.right).map(|s| s * s).sum();
    let power = (energy / n).sqrt().max(MIN_POWER);
    (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_SAMPLE_RATE / ir.sample_rate)
}

pub struct ReverbKernel {
    partition: usize,
    left: Vec<Vec<Complex32>>,
    right: Vec<Vec<Complex32>>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl ReverbKernel {
    pub fn new(ir: &ImpulseResponse, partition: usize) -> anyhow::Result<Self> {
        Self::with_scale(&ir.left, &ir.right, partition, normalization_scale(ir))
    }

    pub fn with_scale(
        left: &[f32],
        right: &[f32],
        partition: usize,
        scale: f32,
    ) -> anyhow::Result<Self> {
        let partition = partition.max(1);
        let fft_len = partition * 2;
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let left = partition_spectra(left, partition, scale, &forward)?;
        let right = partition_spectra(right, partition, scale, &forward)?;

        Ok(Self {
            partition,
            left,
            right,
            forward,
            inverse,
        })
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn num_partitions(&self) -> usize {
        self.left.len().max(self.right.len())
    }
}

// zero-padded FFT of each `partition`-sized slice of one IR channel
fn partition_spectra(
    ir: &[f32],
    partition: usize,
    scale: f32,
    forward: &Arc<dyn RealToComplex<f32>>,
) -> anyhow::Result<Vec<Vec<Complex32>>> {
    let mut spectra = Vec::with_capacity(ir.len().div_ceil(partition));
    for chunk in ir.chunks(partition) {
        let mut padded = forward.make_input_vec();
        for (dst, src) in padded.iter_mut().zip(chunk) {
            *dst = src * scale;
        }
        let mut spectrum = forward.make_output_vec();
        forward
            .process(&mut padded, &mut spectrum)
            .context("impulse response FFT failed")?;
        spectra.push(spectrum);
    }
    Ok(spectra)
}

pub struct Convolver {
    kernel: Arc<ReverbKernel>,
    enabled: bool,

    pos: usize,
    pending: Vec<f32>,  // input block being collected
    previous: Vec<f32>, // last full input block (first half of the overlap-save window)
    ready_l: Vec<f32>,  // wet output being played back
    ready_r: Vec<f32>,

    history: Vec<Vec<Complex32>>, // frequency-domain delay line, newest at `head`
    head: usize,

    window: Vec<f32>,
    accum: Vec<Complex32>,
    fwd_scratch: Vec<Complex32>,
    inv_scratch: Vec<Complex32>,
}

impl Convolver {
    pub fn new(kernel: Arc<ReverbKernel>) -> Self {
        let b = kernel.partition;
        let history = (0..kernel.num_partitions().max(1))
            .map(|_| kernel.forward.make_output_vec())
            .collect();
        Self {
            enabled: true,
            pos: 0,
            pending: vec![0.0; b],
            previous: vec![0.0; b],
            ready_l: vec![0.0; b],
            ready_r: vec![0.0; b],
            history,
            head: 0,
            window: kernel.forward.make_input_vec(),
            accum: kernel.forward.make_output_vec(),
            fwd_scratch: kernel.forward.make_scratch_vec(),
            inv_scratch: kernel.inverse.make_scratch_vec(),
            kernel,
        }
    }

    /// A disabled convolver still tracks its input history (one forward FFT
    /// per block) but skips the accumulate and outputs silence, so the tail is
    /// correct the moment it is re-enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> (f32, f32) {
        let out = (self.ready_l[self.pos], self.ready_r[self.pos]);
        self.pending[self.pos] = input;
        self.pos += 1;
        if self.pos == self.pending.len() {
            self.pos = 0;
            self.run_block();
        }
        out
    }

    fn run_block(&mut self) {
        let b = self.kernel.partition;
        let parts = self.history.len();

        self.window[..b].copy_from_slice(&self.previous);
        self.window[b..].copy_from_slice(&self.pending);
        self.previous.copy_from_slice(&self.pending);

        self.head = (self.head + 1) % parts;
        let forward = &self.kernel.forward;
        if forward
            .process_with_scratch(&mut self.window, &mut self.history[self.head], &mut self.fwd_scratch)
            .is_err()
        {
            self.history[self.head].fill(Complex32::new(0.0, 0.0));
        }

        if !self.enabled {
            self.ready_l.fill(0.0);
            self.ready_r.fill(0.0);
            return;
        }

        let kernel = Arc::clone(&self.kernel);
        Self::accumulate(&self.history, self.head, &kernel.left, &mut self.accum);
        self.inverse_into_left(&kernel);
        Self::accumulate(&self.history, self.head, &kernel.right, &mut self.accum);
        self.inverse_into_right(&kernel);
    }

    fn accumulate(
        history: &[Vec<Complex32>],
        head: usize,
        spectra: &[Vec<Complex32>],
        accum: &mut [Complex32],
    ) {
        let parts = history.len();
        accum.fill(Complex32::new(0.0, 0.0));
        for (k, h) in spectra.iter().enumerate() {
            let x = &history[(head + parts - k % parts) % parts];
            for ((a, x), h) in accum.iter_mut().zip(x).zip(h) {
                *a += x * h;
            }
        }
        // a real signal's DC and Nyquist bins have no imaginary part
        if let Some(first) = accum.first_mut() {
            first.im = 0.0;
        }
        if let Some(last) = accum.last_mut() {
            last.im = 0.0;
        }
    }

    fn inverse_into_left(&mut self, kernel: &ReverbKernel) {
        Self::inverse(kernel, &mut self.accum, &mut self.window, &mut self.inv_scratch, &mut self.ready_l);
    }

    fn inverse_into_right(&mut self, kernel: &ReverbKernel) {
        Self::inverse(kernel, &mut self.accum, &mut self.window, &mut self.inv_scratch, &mut self.ready_r);
    }

    fn inverse(
        kernel: &ReverbKernel,
        accum: &mut [Complex32],
        time: &mut [f32],
        scratch: &mut [Complex32],
        out: &mut [f32],
    ) {
        let b = kernel.partition;
        if kernel.inverse.process_with_scratch(accum, time, scratch).is_err() {
            out.fill(0.0);
            return;
        }
        let norm = 1.0 / time.len() as f32;
        for (o, t) in out.iter_mut().zip(&time[b..]) {
            *o = t * norm;
        }
    }

    pub fn latency(&self) -> usize {
        self.kernel.partition
    }
}
