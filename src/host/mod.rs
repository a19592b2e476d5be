//! The rendering host as seen by the synthesizer.

pub mod scene;

use crate::error::Result;

/// Narrow write-only capability exposed by a rendering host.
///
/// The host interpolates between keyframes; the synthesizer never reads them
/// back.
pub trait KeyframeSink {
    /// Fails with [`crate::error::Error::MissingChannel`] when nothing on the
    /// host is bound to `channel`.
    fn require_channel(&self, channel: &str) -> Result<()>;

    /// Set `channel` to `value` at `frame` and commit it as a keyframe.
    fn set_channel_at_frame(&mut self, channel: &str, frame: u32, value: f32) -> Result<()>;

    fn set_timeline_end(&mut self, frame: u32) -> Result<()>;
}
