// A voice is one triggered sound: a handful of layers (source -> optional
// filter -> gain envelope), each with its own stop time. The renderer owns
// voices in a flat arena per track and drops them once every layer is done;
// nothing else ever looks them up.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::filter::{BiquadFilter, FilterType};
use super::oscillator::{Oscillator, Waveform};
use super::param::Param;

// ── Layer description (built off the audio thread) ────────────────

#[derive(Clone, Debug)]
pub enum SourceSpec {
    Osc {
        waveform: Waveform,
        freq: Param,
        vibrato: Option<Vibrato>,
    },
    Noise,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vibrato {
    pub rate: f32,  // Hz
    pub depth: f32, // Hz of pitch deviation
}

#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub kind: FilterType,
    pub freq: Param,
    pub q: f32,
}

#[derive(Clone, Debug)]
pub struct LayerSpec {
    pub source: SourceSpec,
    pub filter: Option<FilterSpec>,
    pub gain: Param,
    pub stop: f32, // seconds after the voice starts
}

// ── Runtime state ─────────────────────────────────────────────────

enum Source {
    Osc {
        osc: Oscillator,
        freq: Param,
        vibrato: Option<(Oscillator, Vibrato)>,
    },
    Noise(SmallRng),
}

struct Layer {
    source: Source,
    filter: Option<(BiquadFilter, Param)>,
    gain: Param,
    stop_frame: u64,
}

impl Layer {
    fn new(spec: LayerSpec, sample_rate: f32, seed: u64) -> Self {
        let source = match spec.source {
            SourceSpec::Osc { waveform, freq, vibrato } => Source::Osc {
                osc: Oscillator::new(waveform, sample_rate),
                freq,
                vibrato: vibrato.map(|v| (Oscillator::new(Waveform::Sine, sample_rate), v)),
            },
            SourceSpec::Noise => Source::Noise(SmallRng::seed_from_u64(seed)),
        };
        let filter = spec.filter.map(|f| {
            let mut biquad = BiquadFilter::new(f.kind, sample_rate);
            biquad.set_q(f.q);
            biquad.set_frequency(f.freq.value_at(0.0));
            (biquad, f.freq)
        });
        Self {
            source,
            filter,
            gain: spec.gain,
            stop_frame: seconds_to_frames(spec.stop, sample_rate),
        }
    }
}

pub struct Voice {
    start: u64,
    sample_rate: f32,
    layers: Vec<Layer>,
    end_frame: u64, // relative to start
}

impl Voice {
    /// `seed` feeds the noise sources; `start` is an absolute frame on the engine clock.
    pub fn new(specs: Vec<LayerSpec>, sample_rate: f32, start: u64, seed: u64) -> Self {
        let layers: Vec<Layer> = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Layer::new(spec, sample_rate, seed.wrapping_add(i as u64)))
            .collect();
        let end_frame = layers.iter().map(|l| l.stop_frame).max().unwrap_or(0);
        Self {
            start,
            sample_rate,
            layers,
            end_frame,
        }
    }

    pub fn set_start(&mut self, start: u64) {
        self.start = start;
    }

    /// Seconds from start until the last layer stops.
    pub fn duration(&self) -> f32 {
        self.end_frame as f32 / self.sample_rate
    }

    pub fn is_finished_at(&self, frame: u64) -> bool {
        frame >= self.start + self.end_frame
    }

    /// Mix this voice into `out`, where `out[0]` is absolute frame `block_start`.
    pub fn render(&mut self, block_start: u64, out: &mut [f32]) {
        let sr = self.sample_rate;
        for (i, slot) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;
            if frame < self.start {
                continue;
            }
            let rel = frame - self.start;
            if rel >= self.end_frame {
                break;
            }
            let t = rel as f32 / sr;
            let mut sum = 0.0;
            for layer in self.layers.iter_mut() {
                if rel >= layer.stop_frame {
                    continue;
                }
                let raw = match &mut layer.source {
                    Source::Osc { osc, freq, vibrato } => {
                        let mut f = freq.value_at(t);
                        if let Some((lfo, v)) = vibrato {
                            f += lfo.next_sample(v.rate) * v.depth;
                        }
                        osc.next_sample(f)
                    }
                    Source::Noise(rng) => rng.random_range(-1.0f32..1.0),
                };
                let shaped = match &mut layer.filter {
                    Some((biquad, freq)) => {
                        biquad.set_frequency(freq.value_at(t));
                        biquad.process(raw)
                    }
                    None => raw,
                };
                sum += shaped * layer.gain.value_at(t);
            }
            *slot += sum;
        }
    }
}

pub fn seconds_to_frames(seconds: f32, sample_rate: f32) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * sample_rate).round() as u64
    } else {
        0
    }
}
