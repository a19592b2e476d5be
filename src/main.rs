mod audio;
mod cli;
mod config;
mod error;
mod host;
mod keyframes;
mod record;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use audio::analysis::{self, AnalysisParams};
use audio::features::SpectralFeatures;
use cli::{AnalyzeArgs, Cli, Command, SynthesizeArgs};
use config::Config;
use keyframes::synthesize;
use record::AnalysisResult;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Analyze(args) => run_analyze(args, &config),
        Command::Synthesize(args) => run_synthesize(args, &config),
    }
}

fn run_analyze(mut args: AnalyzeArgs, config: &Config) -> Result<()> {
    args.merge_config(&config.analysis);

    log::info!("resonorb analyze");
    log::info!("Input: {}", args.audio.display());
    log::info!("Output: {}", args.out.display());

    log::info!("Decoding audio...");
    let signal = audio::decode::decode_audio(&args.audio)
        .with_context(|| format!("Could not decode {}", args.audio.display()))?;

    let params = AnalysisParams {
        hop_length: args.hop_length,
        frame_length: args.frame_length,
        smoothing: args.smoothing,
    };
    let extractor = SpectralFeatures {
        min_beat_gap: config.analysis.min_beat_gap,
    };

    log::info!("Analyzing audio...");
    let result = analysis::analyze(&signal, &params, &extractor).context("Analysis failed")?;

    result
        .write_json(&args.out)
        .with_context(|| format!("Could not write {}", args.out.display()))?;

    println!(
        "Wrote analysis to {} (frames: {})",
        args.out.display(),
        result.frame_count()
    );
    Ok(())
}

fn run_synthesize(mut args: SynthesizeArgs, config: &Config) -> Result<()> {
    args.merge_config(&config.synthesis);

    log::info!("resonorb synthesize");
    log::info!("Analysis: {}", args.analysis.display());
    log::info!("Output: {}", args.out.display());

    let analysis = AnalysisResult::read_json(&args.analysis)
        .with_context(|| format!("Could not load analysis record {}", args.analysis.display()))?;

    let params = config.synthesis.params(args.fps, args.beat_boost);
    let mut scene = config
        .synthesis
        .build_rig(args.fps)
        .context("Could not build orb rig")?;
    let synthesis = synthesize::synthesize(&analysis, &params).context("Synthesis failed")?;

    let pb = ProgressBar::new(synthesis.keyframe_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} keyframes ({eta} remaining)")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    let committed = synthesize::commit(&synthesis, &mut scene, |n| pb.set_position(n as u64))
        .context("Rendering host rejected the keyframes")?;
    pb.finish_with_message("Keyframes committed");

    scene
        .write_json(&args.out)
        .with_context(|| format!("Could not write {}", args.out.display()))?;

    log::info!(
        "Committed {} keyframes at {}fps",
        committed,
        scene.fps()
    );
    println!(
        "Wrote keyframes to {} (frames 1-{})",
        args.out.display(),
        scene.frame_end()
    );
    Ok(())
}
