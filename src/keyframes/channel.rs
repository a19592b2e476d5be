use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub const SCALE: &str = "scale";
pub const EMISSION: &str = "emission";

/// Linear map from a unit intensity to a channel value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelMapping {
    pub base: f32,
    pub boost: f32,
}

impl ChannelMapping {
    pub const fn new(base: f32, boost: f32) -> Self {
        Self { base, boost }
    }

    pub fn value(&self, intensity: f32) -> f32 {
        self.base + intensity * self.boost
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisParams {
    /// Render frames per second.
    pub fps: u32,
    /// Added to the envelope on beat frames before clamping to 1.0.
    pub beat_boost: f32,
    /// Keyed by channel name; iteration order is the write order.
    pub channels: BTreeMap<String, ChannelMapping>,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            fps: 30,
            beat_boost: 0.3,
            channels: default_channels(),
        }
    }
}

impl SynthesisParams {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(Error::invalid("fps", "must be positive"));
        }
        if !self.beat_boost.is_finite() || self.beat_boost < 0.0 {
            return Err(Error::invalid(
                "beat boost",
                format!("{} must be a non-negative number", self.beat_boost),
            ));
        }
        if self.channels.is_empty() {
            return Err(Error::invalid("channels", "at least one channel mapping is required"));
        }
        Ok(())
    }
}

pub fn default_channels() -> BTreeMap<String, ChannelMapping> {
    BTreeMap::from([
        (SCALE.to_string(), ChannelMapping::new(0.6, 1.4)),
        (EMISSION.to_string(), ChannelMapping::new(8.0, 40.0)),
    ])
}
