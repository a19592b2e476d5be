use super::beats;
use super::decode::AudioSignal;
use super::features::FeatureExtractor;
use crate::error::{Error, Result};
use crate::record::AnalysisResult;

/// Guards normalization against silent input.
pub const NORMALIZE_EPSILON: f32 = 1e-8;

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisParams {
    /// Samples advanced between analysis frames.
    pub hop_length: usize,
    /// Samples per analysis window.
    pub frame_length: usize,
    /// EMA weight of the newest sample, in (0, 1].
    pub smoothing: f32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            hop_length: 512,
            frame_length: 2048,
            smoothing: 0.4,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        if self.hop_length == 0 {
            return Err(Error::invalid("hop length", "must be positive"));
        }
        if self.frame_length == 0 {
            return Err(Error::invalid("frame length", "must be positive"));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(Error::invalid(
                "smoothing factor",
                format!("{} is outside (0, 1]", self.smoothing),
            ));
        }
        if self.frame_length < self.hop_length {
            log::warn!(
                "Frame length {} is shorter than hop length {}; samples between windows are skipped",
                self.frame_length,
                self.hop_length
            );
        }
        Ok(())
    }
}

/// Turn a decoded signal into a smoothed, normalized envelope plus beat frames.
pub fn analyze(
    signal: &AudioSignal,
    params: &AnalysisParams,
    extractor: &impl FeatureExtractor,
) -> Result<AnalysisResult> {
    params.validate()?;
    if signal.sample_rate == 0 {
        return Err(Error::invalid("sample rate", "must be positive"));
    }
    if signal.samples.is_empty() {
        log::warn!("Empty signal, producing an empty envelope");
    }

    log::info!(
        "Envelope: hop={}, frame={} ...",
        params.hop_length,
        params.frame_length
    );
    let raw = extractor.rms(signal, params.hop_length, params.frame_length);
    if !raw.is_empty() && is_silent(&raw) {
        log::warn!("Silent input, the envelope will be all zeros");
    }

    log::info!("Beat tracking...");
    let mut beat_frames = extractor.beat_frames(signal, params.hop_length, params.frame_length);
    beat_frames.sort_unstable();
    beat_frames.dedup();

    log::info!("Smoothing & normalization (alpha={:.2})...", params.smoothing);
    let smoothed = smooth_envelope(&raw, params.smoothing);
    let rms_normalized: Vec<f64> = normalize_envelope(&smoothed)
        .into_iter()
        .map(f64::from)
        .collect();

    let frames_per_second = signal.sample_rate as f32 / params.hop_length as f32;
    log::info!(
        "Analysis: frames={}, beats={}, tempo={:.1} BPM",
        rms_normalized.len(),
        beat_frames.len(),
        beats::estimate_tempo(&beat_frames, frames_per_second)
    );

    Ok(AnalysisResult {
        sample_rate: signal.sample_rate,
        hop_length: params.hop_length,
        frame_length: params.frame_length,
        rms_normalized,
        beat_frames,
        duration_seconds: signal.duration_seconds(),
    })
}

/// True when no frame rises above the normalization guard.
pub fn is_silent(raw: &[f32]) -> bool {
    raw.iter().all(|&v| v < NORMALIZE_EPSILON)
}

/// Single-pole exponential moving average with no warm-up state.
pub fn smooth_envelope(raw: &[f32], alpha: f32) -> Vec<f32> {
    let mut smoothed = Vec::with_capacity(raw.len());
    let mut prev = match raw.first() {
        Some(&first) => first,
        None => return smoothed,
    };
    smoothed.push(prev);
    for &value in &raw[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        smoothed.push(prev);
    }
    smoothed
}

/// Scale into [0, 1] by the envelope peak.
pub fn normalize_envelope(smoothed: &[f32]) -> Vec<f32> {
    let peak = smoothed.iter().copied().fold(0.0f32, f32::max);
    smoothed
        .iter()
        .map(|&v| (v / (peak + NORMALIZE_EPSILON)).clamp(0.0, 1.0))
        .collect()
}
