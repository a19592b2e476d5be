use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::host::scene::Scene;
use crate::keyframes::channel::{self, ChannelMapping, SynthesisParams};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_beat_gap")]
    pub min_beat_gap: f32,
}

#[derive(Debug, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_beat_boost")]
    pub beat_boost: f32,
    #[serde(default = "default_channels")]
    pub channels: BTreeMap<String, ChannelConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChannelConfig {
    pub base: f32,
    pub boost: f32,
    /// Host target name; channels without one must already be bound by the rig.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
}

impl ChannelConfig {
    pub fn mapping(&self) -> ChannelMapping {
        ChannelMapping::new(self.base, self.boost)
    }
}

impl SynthesisConfig {
    pub fn params(&self, fps: u32, beat_boost: f32) -> SynthesisParams {
        SynthesisParams {
            fps,
            beat_boost,
            channels: self
                .channels
                .iter()
                .map(|(name, channel)| (name.clone(), channel.mapping()))
                .collect(),
        }
    }

    /// The default orb rig plus any channel routes named in the config.
    pub fn build_rig(&self, fps: u32) -> Result<Scene> {
        let mut scene = Scene::orb_rig(fps)?;

        for (name, channel) in &self.channels {
            let (Some(target), Some(property)) = (&channel.target, &channel.property) else {
                continue;
            };
            let handle = scene.find_target(target).ok_or_else(|| Error::UnknownTarget {
                channel: name.clone(),
                target: target.clone(),
            })?;
            scene.bind_channel(name, handle, property)?;
        }

        Ok(scene)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hop_length: default_hop_length(),
            frame_length: default_frame_length(),
            smoothing: default_smoothing(),
            min_beat_gap: default_min_beat_gap(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            beat_boost: default_beat_boost(),
            channels: default_channels(),
        }
    }
}

fn default_hop_length() -> usize { 512 }
fn default_frame_length() -> usize { 2048 }
fn default_smoothing() -> f32 { 0.4 }
fn default_min_beat_gap() -> f32 { 0.1 }
fn default_fps() -> u32 { 30 }
fn default_beat_boost() -> f32 { 0.3 }

fn default_channels() -> BTreeMap<String, ChannelConfig> {
    channel::default_channels()
        .into_iter()
        .map(|(name, mapping)| {
            (
                name,
                ChannelConfig {
                    base: mapping.base,
                    boost: mapping.boost,
                    target: None,
                    property: None,
                },
            )
        })
        .collect()
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `resonorb.toml` in the working directory, else the
/// user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("resonorb.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("resonorb").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("resonorb").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
