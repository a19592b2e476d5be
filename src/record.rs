//! The analysis record passed from `analyze` to `synthesize`.
//!
//! It is self-describing: the synthesizer never needs the original audio.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Hz
    pub sample_rate: u32,
    pub hop_length: usize,
    pub frame_length: usize,
    /// Smoothed RMS envelope in [0, 1], one value per analysis frame.
    /// Kept as f64 so records from any producer read back exactly.
    pub rms_normalized: Vec<f64>,
    /// Analysis-frame indices, ascending.
    pub beat_frames: Vec<usize>,
    pub duration_seconds: f64,
}

impl AnalysisResult {
    pub fn frame_count(&self) -> usize {
        self.rms_normalized.len()
    }

    /// Write as indented JSON, creating parent directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let record_io = |source| Error::RecordIo {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(record_io)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::RecordFormat {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, json).map_err(record_io)?;

        log::debug!("Wrote analysis record: {}", path.display());
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::RecordIo {
            path: path.display().to_string(),
            source,
        })?;
        let record: AnalysisResult =
            serde_json::from_str(&content).map_err(|source| Error::RecordFormat {
                path: path.display().to_string(),
                source,
            })?;

        log::info!(
            "Loaded analysis: {} frames, {} beats, {}Hz, hop={}, {:.1}s",
            record.frame_count(),
            record.beat_frames.len(),
            record.sample_rate,
            record.hop_length,
            record.duration_seconds
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal() -> AnalysisResult {
        AnalysisResult {
            sample_rate: 44100,
            hop_length: 512,
            frame_length: 2048,
            rms_normalized: vec![0.0, 0.1, 0.735_294_1, 1.0, 0.333_333_34],
            beat_frames: vec![1, 3],
            duration_seconds: 0.058_049_886_621_315_19,
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("analysis.json");
        let record = literal();

        record.write_json(&path).unwrap();
        let back = AnalysisResult::read_json(&path).unwrap();

        assert_eq!(back, record);
    }

    #[test]
    fn uses_documented_field_names() {
        let value = serde_json::to_value(literal()).unwrap();
        for key in [
            "sample_rate",
            "hop_length",
            "frame_length",
            "rms_normalized",
            "beat_frames",
            "duration_seconds",
        ] {
            assert!(value.get(key).is_some(), "missing field {}", key);
        }
    }

    #[test]
    fn reads_record_written_by_other_tools() {
        let json = r#"{
            "sample_rate": 22050,
            "hop_length": 512,
            "frame_length": 2048,
            "rms_normalized": [0.0, 0.5, 1.0],
            "beat_frames": [2],
            "duration_seconds": 0.05
        }"#;
        let record: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(record.frame_count(), 3);
        assert_eq!(record.beat_frames, vec![2]);
    }

    #[test]
    fn double_precision_envelope_reads_back_exactly() {
        let json = r#"{
            "sample_rate": 22050,
            "hop_length": 512,
            "frame_length": 2048,
            "rms_normalized": [0.123456789012345, 0.9999999999999999],
            "beat_frames": [],
            "duration_seconds": 0.05
        }"#;
        let record: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(record.rms_normalized, vec![0.123456789012345, 0.9999999999999999]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        record.write_json(&path).unwrap();
        assert_eq!(AnalysisResult::read_json(&path).unwrap(), record);
    }

    #[test]
    fn malformed_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"sample_rate": 44100}"#).unwrap();
        let err = AnalysisResult::read_json(&path).unwrap_err();
        assert!(matches!(err, Error::RecordFormat { .. }));

        let err = AnalysisResult::read_json(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::RecordIo { .. }));
    }
}
