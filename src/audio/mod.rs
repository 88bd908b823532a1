//! Audio ingestion and normalization.
//!
//! 1. Decode (or receive) PCM → mono `f32` [`AudioSample`].
//! 2. Resample to the canonical rate.
//! 3. Gate out near-silence.
//!
//! The capture collaborator owns devices and containers; this module only
//! offers a WAV convenience loader for the common boundary case.

mod loader;
mod normalizer;

pub use loader::{load_wav, load_wav_file};
pub use normalizer::{Normalized, SignalNormalizer};

use thiserror::Error;

/// Failure while getting raw audio into canonical shape.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The byte stream could not be decoded as audio.
    #[error("load: {0}")]
    Load(#[from] hound::Error),
    /// Decoding succeeded but yielded zero samples.
    #[error("audio contains no samples")]
    Empty,
    /// Sample-rate conversion failed.
    #[error("resample: {0}")]
    Resample(String),
}

/// One mono clip: amplitudes in `[-1, 1]` plus the rate they were captured at.
///
/// Ephemeral – owned by the caller for the duration of one extraction call.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSample {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSample {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Downmix interleaved multi-channel PCM to mono by averaging channels.
    pub fn from_interleaved(interleaved: &[f32], channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1) as usize;
        if channels == 1 {
            return Self::new(interleaved.to_vec(), sample_rate);
        }
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_stereo_averages_channels() {
        let stereo = [1.0, -1.0, 0.5, 0.5, 0.0, 1.0];
        let mono = AudioSample::from_interleaved(&stereo, 2, 44_100);
        assert_eq!(mono.samples, vec![0.0, 0.5, 0.5]);
        assert_eq!(mono.sample_rate, 44_100);
    }

    #[test]
    fn mono_passthrough_keeps_samples() {
        let mono = AudioSample::from_interleaved(&[0.1, 0.2], 1, 22_050);
        assert_eq!(mono.samples, vec![0.1, 0.2]);
    }
}
