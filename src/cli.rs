use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AnalysisConfig, SynthesisConfig};

#[derive(Parser, Debug)]
#[command(name = "resonorb", about = "Audio-reactive keyframe generator for an animated orb")]
pub struct Cli {
    /// Config file (defaults to ./resonorb.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze an audio file into a smoothed envelope and beat frames
    Analyze(AnalyzeArgs),
    /// Turn an analysis record into keyframes on the orb rig
    Synthesize(SynthesizeArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub audio: PathBuf,

    /// Where to write the analysis JSON
    pub out: PathBuf,

    /// Samples advanced between analysis frames
    #[arg(long, default_value_t = 512)]
    pub hop_length: usize,

    /// Samples per analysis window
    #[arg(long, default_value_t = 2048)]
    pub frame_length: usize,

    /// EMA smoothing factor (0.0-1.0, weight of the newest frame)
    #[arg(long, default_value_t = 0.4)]
    pub smoothing: f32,
}

#[derive(clap::Args, Debug)]
pub struct SynthesizeArgs {
    /// Analysis JSON produced by `analyze`
    pub analysis: PathBuf,

    /// Where to write the keyframed scene JSON
    pub out: PathBuf,

    /// Render frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Intensity added on beat frames (result is capped at 1.0)
    #[arg(long, default_value_t = 0.3)]
    pub beat_boost: f32,
}

impl AnalyzeArgs {
    /// Config values apply only when the CLI is at its default.
    pub fn merge_config(&mut self, config: &AnalysisConfig) {
        if self.hop_length == 512 { self.hop_length = config.hop_length; }
        if self.frame_length == 2048 { self.frame_length = config.frame_length; }
        if self.smoothing == 0.4 { self.smoothing = config.smoothing; }
    }
}

impl SynthesizeArgs {
    pub fn merge_config(&mut self, config: &SynthesisConfig) {
        if self.fps == 30 { self.fps = config.fps; }
        if self.beat_boost == 0.3 { self.beat_boost = config.beat_boost; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_defaults() {
        let cli = Cli::parse_from(["resonorb", "analyze", "in.wav", "out/analysis.json"]);
        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.audio, PathBuf::from("in.wav"));
                assert_eq!(args.hop_length, 512);
                assert_eq!(args.frame_length, 2048);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_synthesize_overrides() {
        let cli = Cli::parse_from([
            "resonorb",
            "synthesize",
            "analysis.json",
            "scene.json",
            "--fps",
            "24",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Synthesize(args) => {
                assert_eq!(args.fps, 24);
                assert_eq!(args.beat_boost, 0.3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn analyze_requires_both_paths() {
        assert!(Cli::try_parse_from(["resonorb", "analyze", "in.wav"]).is_err());
    }

    #[test]
    fn config_fills_in_flags_left_at_default() {
        let config: crate::config::Config =
            toml::from_str("[analysis]\nhop_length = 256\nsmoothing = 0.2\n\n[synthesis]\nfps = 60\nbeat_boost = 0.5\n")
                .unwrap();

        let cli = Cli::parse_from(["resonorb", "analyze", "in.wav", "a.json", "--smoothing", "0.7"]);
        let Command::Analyze(mut args) = cli.command else {
            panic!("expected analyze");
        };
        args.merge_config(&config.analysis);
        assert_eq!(args.hop_length, 256);
        assert_eq!(args.frame_length, 2048);
        assert_eq!(args.smoothing, 0.7);

        let cli = Cli::parse_from(["resonorb", "synthesize", "a.json", "s.json", "--fps", "24"]);
        let Command::Synthesize(mut args) = cli.command else {
            panic!("expected synthesize");
        };
        args.merge_config(&config.synthesis);
        assert_eq!(args.fps, 24);
        assert_eq!(args.beat_boost, 0.5);
    }
}
