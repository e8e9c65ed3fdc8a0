/*!
 * PCM WAV reading with `hound`.
 */

use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::errors::MediaError;

/// Basic facts about a WAV file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel
    pub num_samples: usize,
}

impl WavInfo {
    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.num_samples as f64 / self.sample_rate.max(1) as f64
    }
}

/// Read the header of a WAV file
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo, MediaError> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .map_err(|e| MediaError::WavDecode(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        num_samples: reader.duration() as usize,
    })
}

/// Decode a WAV file to mono f32 samples in [-1, 1] and its sample rate
pub fn read_mono_samples<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32), MediaError> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path)
        .map_err(|e| MediaError::WavDecode(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let decode_err = |e: hound::Error| MediaError::WavDecode(format!("{}: {}", path.display(), e));

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0).map_err(decode_err))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0).map_err(decode_err))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0).map_err(decode_err))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(decode_err))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(MediaError::WavDecode(format!(
                "unsupported WAV format {:?} with {} bits",
                format, bits
            )));
        }
    };

    let channels = spec.channels.max(1) as usize;
    if channels == 1 {
        return Ok((samples, spec.sample_rate));
    }

    let mono = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}
