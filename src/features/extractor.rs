//! Feature extraction with a graceful fallback chain.
//!
//! `extract` runs one configured mode and answers with `Option` – "could not
//! extract" is an expected outcome a caller may respond to by trying another
//! mode, not an exception. `extract_with_fallback` encodes the standard chain:
//! configured mode → the other mode → a degraded manual spectral estimate
//! (naive DFT over short windows) that still yields a canonically shaped
//! encoding for very short clips.

use super::cepstral::CepstralExtractor;
use super::encoding::FeatureEncoding;
use super::mel::MelSpectrogram;
use crate::config::{FeatureConfig, FeatureKind};
use crate::constants::{MIN_EXTRACT_SAMPLES, POWER_FLOOR};

/// Successful extraction plus how it was obtained.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub encoding: FeatureEncoding,
    /// Mode whose geometry the encoding follows.
    pub kind: FeatureKind,
    /// True when only the degraded estimate succeeded.
    pub degraded: bool,
    /// Mode that failed first, when the chain moved past the configured one.
    pub fell_back_from: Option<FeatureKind>,
}

/// Stateless-per-call extractor; DSP tables are built once at construction.
pub struct FeatureExtractor {
    cfg: FeatureConfig,
    mel: MelSpectrogram,
    cepstral: CepstralExtractor,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, cfg: FeatureConfig) -> Self {
        let mel = MelSpectrogram::new(sample_rate, cfg.n_fft, cfg.hop_length, cfg.mel_bands);
        let cepstral = CepstralExtractor::new(cfg.mel_bands, cfg.cepstral_coeffs);
        Self { cfg, mel, cepstral }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Run one extraction mode over normalized samples.
    ///
    /// `None` when the clip is too short for the configured analysis window
    /// or the spectral step yields no frames.
    pub fn extract(&self, samples: &[f32], kind: FeatureKind) -> Option<FeatureEncoding> {
        if samples.len() < MIN_EXTRACT_SAMPLES {
            return None;
        }

        let rows = match kind {
            FeatureKind::Spectrogram => self.mel.db_frames(samples),
            FeatureKind::Mfcc => self.cepstral.frames(&self.mel, samples),
        };
        if rows.is_empty() {
            return None;
        }

        FeatureEncoding::from_rows(rows, self.cfg.frames)
    }

    /// Configured mode → alternate mode → degraded estimate.
    pub fn extract_with_fallback(&self, samples: &[f32]) -> Option<Extraction> {
        let primary = self.cfg.kind;
        if let Some(encoding) = self.extract(samples, primary) {
            return Some(Extraction {
                encoding,
                kind: primary,
                degraded: false,
                fell_back_from: None,
            });
        }

        let secondary = match primary {
            FeatureKind::Spectrogram => FeatureKind::Mfcc,
            FeatureKind::Mfcc => FeatureKind::Spectrogram,
        };
        if let Some(encoding) = self.extract(samples, secondary) {
            return Some(Extraction {
                encoding,
                kind: secondary,
                degraded: false,
                fell_back_from: Some(primary),
            });
        }

        self.degraded_estimate(samples).map(|encoding| Extraction {
            encoding,
            kind: primary,
            degraded: true,
            fell_back_from: Some(primary),
        })
    }

    /// Last-resort band-energy estimate: naive DFT over short windows summed
    /// into linear bands with the primary mode's bin count. Coarse, but keeps
    /// the fixed-shape contract alive for clips the FFT window rejects.
    fn degraded_estimate(&self, samples: &[f32]) -> Option<FeatureEncoding> {
        let bins = self.cfg.bins();
        let win = (self.cfg.hop_length / 2).max(bins);
        let hop = (win / 2).max(1);
        if samples.len() < win {
            return None;
        }

        let num_frames = 1 + (samples.len() - win) / hop;
        let mut rows = Vec::with_capacity(num_frames);

        for i in 0..num_frames {
            let frame = &samples[i * hop..i * hop + win];
            let mut row = Vec::with_capacity(bins);
            for k in 0..bins {
                // Band center as a fraction of Nyquist.
                let omega =
                    std::f32::consts::PI * (k as f32 + 0.5) / bins as f32;
                let (mut re, mut im) = (0.0f32, 0.0f32);
                for (n, &x) in frame.iter().enumerate() {
                    let phase = omega * n as f32;
                    re += x * phase.cos();
                    im -= x * phase.sin();
                }
                let power = (re * re + im * im) / win as f32;
                row.push(power.max(POWER_FLOOR).ln());
            }
            rows.push(row);
        }

        FeatureEncoding::from_rows(rows, self.cfg.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        let n = (sr as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn extractor(kind: FeatureKind) -> FeatureExtractor {
        let cfg = FeatureConfig {
            kind,
            ..FeatureConfig::default()
        };
        FeatureExtractor::new(22_050, cfg)
    }

    #[test]
    fn both_modes_honor_the_fixed_shape() {
        for (kind, bins) in [(FeatureKind::Spectrogram, 128), (FeatureKind::Mfcc, 13)] {
            let ex = extractor(kind);
            for secs in [0.15, 2.0, 6.0] {
                let enc = ex.extract(&tone(440.0, 22_050, secs), kind).unwrap();
                assert_eq!(enc.shape(), (100, bins), "kind={kind} secs={secs}");
            }
        }
    }

    #[test]
    fn too_short_clip_yields_none() {
        let ex = extractor(FeatureKind::Spectrogram);
        let enc = ex.extract(&tone(440.0, 22_050, 0.01), FeatureKind::Spectrogram);
        assert!(enc.is_none());
    }

    #[test]
    fn fallback_reaches_the_degraded_estimate() {
        let ex = extractor(FeatureKind::Spectrogram);
        // 300 samples: below the FFT minimum, above the degraded window.
        let clip = tone(440.0, 22_050, 0.0136);
        assert!(clip.len() < 512 && clip.len() >= 256, "len={}", clip.len());

        let out = ex.extract_with_fallback(&clip).unwrap();
        assert!(out.degraded);
        assert_eq!(out.fell_back_from, Some(FeatureKind::Spectrogram));
        assert_eq!(out.encoding.shape(), (100, 128));
    }

    #[test]
    fn fallback_prefers_the_configured_mode() {
        let ex = extractor(FeatureKind::Mfcc);
        let out = ex.extract_with_fallback(&tone(440.0, 22_050, 1.0)).unwrap();
        assert_eq!(out.kind, FeatureKind::Mfcc);
        assert!(!out.degraded);
        assert!(out.fell_back_from.is_none());
    }
}
