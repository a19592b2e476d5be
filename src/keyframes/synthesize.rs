use std::collections::{BTreeMap, HashSet};

use super::channel::SynthesisParams;
use super::Keyframe;
use crate::error::{Error, Result};
use crate::host::KeyframeSink;
use crate::record::AnalysisResult;

/// Keyframes for one animatable channel, in non-decreasing frame order.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterTrack {
    pub channel: String,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Synthesis {
    pub tracks: BTreeMap<String, ParameterTrack>,
    /// Last render frame written, or 1 for an empty envelope.
    pub timeline_end_frame: u32,
}

impl Synthesis {
    pub fn keyframe_count(&self) -> usize {
        self.tracks.values().map(|t| t.keyframes.len()).sum()
    }
}

/// Seconds elapsed at the start of analysis frame `idx`.
pub fn analysis_time(idx: usize, hop_length: usize, sample_rate: u32) -> f64 {
    idx as f64 * hop_length as f64 / sample_rate as f64
}

/// Render frame on a 1-indexed timeline for analysis frame `idx`.
///
/// Neighbouring analysis frames may share a render frame, or skip some.
pub fn render_frame(idx: usize, hop_length: usize, sample_rate: u32, fps: u32) -> u32 {
    let time = analysis_time(idx, hop_length, sample_rate);
    // Float-to-int casts saturate; keep the result at or above frame 1.
    ((time * fps as f64).round_ties_even() as u32).saturating_add(1)
}

/// Envelope amplitude plus the beat push, never above 1.0.
pub fn beat_intensity(amp: f32, on_beat: bool, beat_boost: f32) -> f32 {
    let push = if on_beat { beat_boost } else { 0.0 };
    (amp + push).clamp(0.0, 1.0)
}

pub fn synthesize(analysis: &AnalysisResult, params: &SynthesisParams) -> Result<Synthesis> {
    params.validate()?;
    if analysis.sample_rate == 0 {
        return Err(Error::invalid("sample rate", "analysis record has sample_rate 0"));
    }
    if analysis.hop_length == 0 {
        return Err(Error::invalid("hop length", "analysis record has hop_length 0"));
    }

    let beats: HashSet<usize> = analysis.beat_frames.iter().copied().collect();
    let n = analysis.rms_normalized.len();

    let mut tracks: BTreeMap<String, ParameterTrack> = params
        .channels
        .keys()
        .map(|name| {
            (
                name.clone(),
                ParameterTrack {
                    channel: name.clone(),
                    keyframes: Vec::with_capacity(n),
                },
            )
        })
        .collect();

    let mut timeline_end_frame = 1;
    for (idx, &amp) in analysis.rms_normalized.iter().enumerate() {
        let frame = render_frame(idx, analysis.hop_length, analysis.sample_rate, params.fps);
        let intensity = beat_intensity(amp as f32, beats.contains(&idx), params.beat_boost);

        for (name, mapping) in &params.channels {
            if let Some(track) = tracks.get_mut(name) {
                track.keyframes.push(Keyframe::new(frame, mapping.value(intensity)));
            }
        }
        timeline_end_frame = timeline_end_frame.max(frame);
    }

    if n == 0 {
        log::warn!("Empty envelope, no keyframes to synthesize");
    }
    log::info!(
        "Synthesized {} channels x {} keyframes at {}fps, timeline 1-{}",
        tracks.len(),
        n,
        params.fps,
        timeline_end_frame
    );

    Ok(Synthesis {
        tracks,
        timeline_end_frame,
    })
}

/// Write every keyframe to the host one at a time, then set the timeline end.
///
/// All channels are checked against the host before the first write.
/// `on_progress` receives the running count of committed keyframes.
pub fn commit(
    synthesis: &Synthesis,
    sink: &mut impl KeyframeSink,
    mut on_progress: impl FnMut(usize),
) -> Result<usize> {
    for channel in synthesis.tracks.keys() {
        sink.require_channel(channel)?;
    }

    let mut committed = 0;
    for track in synthesis.tracks.values() {
        for keyframe in &track.keyframes {
            sink.set_channel_at_frame(&track.channel, keyframe.frame, keyframe.value)?;
            committed += 1;
            on_progress(committed);
        }
        log::debug!("Committed {} keyframes to '{}'", track.keyframes.len(), track.channel);
    }

    sink.set_timeline_end(synthesis.timeline_end_frame)?;
    Ok(committed)
}
