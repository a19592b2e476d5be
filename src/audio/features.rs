use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::beats;
use super::decode::AudioSignal;

/// Loudness and rhythm features computed on a shared hop grid.
///
/// Frame `i` of every feature is centered on sample `i * hop_length`.
pub trait FeatureExtractor {
    /// Root-mean-square energy per analysis frame.
    fn rms(&self, signal: &AudioSignal, hop_length: usize, frame_length: usize) -> Vec<f32>;

    /// Analysis-frame indices that carry a beat onset, ascending.
    fn beat_frames(&self, signal: &AudioSignal, hop_length: usize, frame_length: usize) -> Vec<usize>;
}

/// Default extractor: centered RMS windows and spectral-flux beat tracking.
#[derive(Clone, Debug)]
pub struct SpectralFeatures {
    /// Minimum spacing between two detected beats, in seconds.
    pub min_beat_gap: f32,
}

impl Default for SpectralFeatures {
    fn default() -> Self {
        Self { min_beat_gap: 0.1 }
    }
}

/// Width of the adaptive threshold neighbourhood, in seconds on each side.
const THRESHOLD_WINDOW_SECONDS: f32 = 0.25;

impl FeatureExtractor for SpectralFeatures {
    fn rms(&self, signal: &AudioSignal, hop_length: usize, frame_length: usize) -> Vec<f32> {
        let samples = &signal.samples;
        let n_frames = frame_count(samples.len(), hop_length);
        let half = (frame_length / 2) as isize;

        (0..n_frames)
            .into_par_iter()
            .map(|i| {
                let start = (i * hop_length) as isize - half;
                let (lo, hi) = clip_window(start, frame_length, samples.len());
                let energy: f32 = samples[lo..hi].iter().map(|s| s * s).sum();
                // Zero padding counts toward the window length.
                (energy / frame_length as f32).sqrt()
            })
            .collect()
    }

    fn beat_frames(&self, signal: &AudioSignal, hop_length: usize, frame_length: usize) -> Vec<usize> {
        let onset = onset_strength(&signal.samples, hop_length, frame_length);
        if onset.is_empty() {
            return Vec::new();
        }

        let frames_per_second = signal.sample_rate as f32 / hop_length as f32;
        let window = ((THRESHOLD_WINDOW_SECONDS * frames_per_second).round() as usize).max(1);
        let min_gap = (self.min_beat_gap * frames_per_second).ceil() as usize;

        let beat_frames = beats::pick_peaks(&onset, window, min_gap);
        log::debug!(
            "Onset envelope: {} frames, threshold window {}, min gap {} frames",
            onset.len(),
            window,
            min_gap
        );
        beat_frames
    }
}

/// Number of centered frames for a signal of `len` samples.
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    if len == 0 {
        0
    } else {
        1 + len / hop_length
    }
}

fn clip_window(start: isize, frame_length: usize, len: usize) -> (usize, usize) {
    let end = start + frame_length as isize;
    let lo = start.clamp(0, len as isize) as usize;
    let hi = end.clamp(0, len as isize) as usize;
    (lo, hi)
}

/// Frames per parallel flux task. Each task re-derives the spectrum of the
/// frame just before its range, so only two spectra are live per task.
const FLUX_CHUNK_FRAMES: usize = 256;

/// Windowed magnitude spectra on the centered hop grid.
struct SpectrumFrames<'a> {
    samples: &'a [f32],
    hop_length: usize,
    frame_length: usize,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrumFrames<'_> {
    fn bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    fn magnitudes(&self, frame: usize, buffer: &mut [Complex<f32>], out: &mut [f32]) {
        let start = (frame * self.hop_length) as isize - (self.frame_length / 2) as isize;
        for (k, slot) in buffer.iter_mut().enumerate() {
            let pos = start + k as isize;
            *slot = if pos >= 0 && (pos as usize) < self.samples.len() {
                Complex::new(self.samples[pos as usize] * self.hann[k], 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }
        self.fft.process(buffer);
        for (m, c) in out.iter_mut().zip(buffer.iter()) {
            *m = c.norm();
        }
    }

    /// Half-wave rectified flux for frames `first..last`.
    fn flux(&self, first: usize, last: usize) -> Vec<f32> {
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_length];
        let mut prev = vec![0.0f32; self.bins()];
        let mut cur = vec![0.0f32; self.bins()];
        if first > 0 {
            self.magnitudes(first - 1, &mut buffer, &mut prev);
        }

        let mut flux: Vec<f32> = Vec::with_capacity(last - first);
        for frame in first..last {
            self.magnitudes(frame, &mut buffer, &mut cur);
            flux.push(
                cur.iter()
                    .zip(prev.iter())
                    .map(|(c, p)| (c - p).max(0.0))
                    .sum(),
            );
            std::mem::swap(&mut prev, &mut cur);
        }
        flux
    }
}

/// Half-wave rectified spectral flux, normalized so the strongest onset is 1.0.
///
/// Returns all zeros when the signal carries no spectral change at all.
fn onset_strength(samples: &[f32], hop_length: usize, frame_length: usize) -> Vec<f32> {
    let n_frames = frame_count(samples.len(), hop_length);
    if n_frames == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f32>::new();
    let frames = SpectrumFrames {
        samples,
        hop_length,
        frame_length,
        hann: hann_window(frame_length),
        fft: planner.plan_fft_forward(frame_length),
    };

    let n_chunks = n_frames.div_ceil(FLUX_CHUNK_FRAMES);
    let mut flux: Vec<f32> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk| {
            let first = chunk * FLUX_CHUNK_FRAMES;
            frames.flux(first, (first + FLUX_CHUNK_FRAMES).min(n_frames))
        })
        .collect::<Vec<Vec<f32>>>()
        .concat();

    let peak = flux.iter().copied().fold(0.0f32, f32::max);
    if peak > 1e-6 {
        flux.iter_mut().for_each(|f| *f /= peak);
    } else {
        flux.iter_mut().for_each(|f| *f = 0.0);
    }
    flux
}

fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
