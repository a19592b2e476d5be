use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// A decoded mono waveform.
#[derive(Clone, Debug)]
pub struct AudioSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioSignal> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| Error::AudioOpen {
        path: display.clone(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|source| Error::Decode {
            path: display.clone(),
            source,
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioTrack {
            path: display.clone(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::MissingSampleRate {
            path: display.clone(),
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|source| Error::Decode {
            path: display.clone(),
            source,
        })?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(source) => {
                return Err(Error::Decode {
                    path: display,
                    source,
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet in {}: {}", display, msg);
                continue;
            }
            Err(source) => {
                return Err(Error::Decode {
                    path: display,
                    source,
                })
            }
        };

        append_mono(decoded, &mut all_samples);
    }

    let signal = AudioSignal::new(all_samples, sample_rate);
    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        signal.samples.len(),
        signal.sample_rate,
        signal.duration_seconds()
    );

    Ok(signal)
}

/// Append a decoded packet as mono. The channel count comes from the packet
/// itself; container headers may omit it.
fn append_mono(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    let spec = *decoded.spec();
    let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
    sample_buf.copy_interleaved_ref(decoded);
    downmix_into(sample_buf.samples(), spec.channels.count(), out);
}

/// Average interleaved frames down to a single channel.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
