//! Runtime configuration for the verification pipeline.
//!
//! Plain serde-derived structs; `Default` impls carry the canonical values
//! from [`crate::constants`]. Collaborators may build these from any source
//! (file, flags, env) – the core only consumes the structs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::constants::*;

/// Which spectral representation the extractor produces.
///
/// Verification always compares like-for-like: encodings of different kinds
/// (different bin counts) score 0.0 against each other.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FeatureKind {
    /// Log-power mel spectrogram (`mel_bands` bins per frame).
    Spectrogram,
    /// Cepstral coefficients (`cepstral_coeffs` bins per frame).
    Mfcc,
}

/// Audio normalization knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Canonical sample rate every clip is resampled to.
    pub sample_rate: u32,
    /// Absolute amplitude below which a sample counts as silence.
    pub silence_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: CANONICAL_SAMPLE_RATE,
            silence_threshold: SILENCE_THRESHOLD,
        }
    }
}

/// Spectral feature extraction knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Default extraction mode; callers may override per attempt.
    pub kind: FeatureKind,
    /// FFT window length in samples.
    pub n_fft: usize,
    /// Hop between analysis frames in samples.
    pub hop_length: usize,
    /// Mel bands for [`FeatureKind::Spectrogram`].
    pub mel_bands: usize,
    /// Coefficients for [`FeatureKind::Mfcc`].
    pub cepstral_coeffs: usize,
    /// Fixed time dimension of every encoding (truncate/zero-pad target).
    pub frames: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            kind: FeatureKind::Spectrogram,
            n_fft: FEATURE_N_FFT,
            hop_length: FEATURE_HOP_LENGTH,
            mel_bands: MEL_BANDS,
            cepstral_coeffs: CEPSTRAL_COEFFS,
            frames: CANONICAL_FRAME_COUNT,
        }
    }
}

impl FeatureConfig {
    /// Frequency-bin count of the given extraction mode.
    pub fn bins_for(&self, kind: FeatureKind) -> usize {
        match kind {
            FeatureKind::Spectrogram => self.mel_bands,
            FeatureKind::Mfcc => self.cepstral_coeffs,
        }
    }

    /// Frequency-bin count of the configured default mode.
    pub fn bins(&self) -> usize {
        self.bins_for(self.kind)
    }
}

/// Decision thresholds for the verification policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Closed-set accept threshold.
    pub accept_threshold: f32,
    /// Open-set accept threshold.
    pub identify_accept_threshold: f32,
    /// Open-set possible-match floor; below it the attempt is rejected.
    pub identify_possible_threshold: f32,
    /// Softmax-max gate for classifier confidence.
    pub classifier_confidence_threshold: f32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            accept_threshold: VERIFY_ACCEPT_THRESHOLD,
            identify_accept_threshold: IDENTIFY_ACCEPT_THRESHOLD,
            identify_possible_threshold: IDENTIFY_POSSIBLE_THRESHOLD,
            classifier_confidence_threshold: CLASSIFIER_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoxGateConfig {
    pub audio: AudioConfig,
    pub feature: FeatureConfig,
    pub verify: VerifyConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn feature_kind_string_forms_round_trip() {
        assert_eq!(FeatureKind::Spectrogram.to_string(), "spectrogram");
        assert_eq!(FeatureKind::Mfcc.to_string(), "mfcc");
        assert_eq!(
            FeatureKind::from_str("mfcc").unwrap(),
            FeatureKind::Mfcc
        );
        assert!(FeatureKind::from_str("wavelet").is_err());
    }

    #[test]
    fn default_bins_follow_kind() {
        let cfg = FeatureConfig::default();
        assert_eq!(cfg.bins(), 128);
        assert_eq!(cfg.bins_for(FeatureKind::Mfcc), 13);
    }
}
