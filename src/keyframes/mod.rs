//! Maps an analysis record onto render-frame keyframes.

pub mod channel;
pub mod synthesize;

use serde::{Deserialize, Serialize};

/// One committed value on a channel's timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// 1-indexed render frame.
    pub frame: u32,
    pub value: f32,
}

impl Keyframe {
    pub fn new(frame: u32, value: f32) -> Self {
        Self { frame, value }
    }
}
