//! Peak picking on an onset envelope, and a rough tempo estimate from the
//! resulting beat grid.

/// Pick beat frames from a normalized onset envelope.
///
/// A frame is a beat when it exceeds an adaptive threshold derived from its
/// `window` neighbours on each side, is a local maximum, and lies at least
/// `min_gap` frames after the previous beat.
pub fn pick_peaks(onset: &[f32], window: usize, min_gap: usize) -> Vec<usize> {
    let mut beats: Vec<usize> = Vec::new();

    for i in 0..onset.len() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(onset.len());
        let local_mean: f32 = onset[start..end].iter().sum::<f32>() / (end - start) as f32;

        let threshold = local_mean * 1.5 + 0.01;
        if onset[i] <= threshold {
            continue;
        }

        let is_peak = (i == 0 || onset[i] >= onset[i - 1])
            && (i == onset.len() - 1 || onset[i] >= onset[i + 1]);
        let far_enough = beats.last().map_or(true, |&last| i - last >= min_gap);

        if is_peak && far_enough {
            beats.push(i);
        }
    }

    beats
}

/// Median-interval tempo in BPM, or 120 when the grid is too sparse.
pub fn estimate_tempo(beat_frames: &[usize], frames_per_second: f32) -> f32 {
    if beat_frames.len() < 2 || frames_per_second <= 0.0 {
        return 120.0;
    }

    // 60-200 BPM
    let mut reasonable: Vec<f32> = beat_frames
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32 / frames_per_second)
        .filter(|&interval| (0.3..=1.0).contains(&interval))
        .collect();

    if reasonable.is_empty() {
        return 120.0;
    }

    reasonable.sort_by(|a, b| a.total_cmp(b));
    60.0 / reasonable[reasonable.len() / 2]
}
