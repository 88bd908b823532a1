//! Mel-scaled power spectrogram.
//!
//! 1. Reflection-padded, Hann-windowed STFT (`rustfft`).
//! 2. Power spectrum → triangular mel filterbank (HTK scale, area-normalized).
//! 3. Optional decibel scaling referenced to the clip's own peak power, with
//!    an 80 dB floor below it.
//!
//! The FFT plan and filterbank are built once in `new` and reused.

use std::sync::Arc;

use rustfft::{num_complex::Complex32, FftPlanner};

use crate::constants::{DB_TOP, POWER_FLOOR};

/// Reusable mel spectrogram front-end.
pub struct MelSpectrogram {
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    filters: Vec<Vec<f32>>, // [mel_bin][freq_bin]
    window: Vec<f32>,
    fft: Arc<dyn rustfft::Fft<f32>>,
}

impl MelSpectrogram {
    pub fn new(sample_rate: u32, n_fft: usize, hop_length: usize, n_mels: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length,
            n_mels,
            filters: mel_filterbank(n_fft, n_mels, sample_rate),
            window: hann_window(n_fft),
            fft,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    /// Mel *power* frames, `[frame][mel_bin]`, no log scaling.
    pub fn power_frames(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.stft_power(samples)
            .iter()
            .map(|spectrum| {
                self.filters
                    .iter()
                    .map(|filter| {
                        filter
                            .iter()
                            .zip(spectrum.iter())
                            .map(|(f, p)| f * p)
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }

    /// Mel frames on a decibel scale referenced to the clip's peak power.
    pub fn db_frames(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut frames = self.power_frames(samples);
        power_to_db(&mut frames);
        frames
    }

    /// Reflection-padded power STFT, `[frame][freq_bin]` with
    /// `n_fft / 2 + 1` bins per frame.
    fn stft_power(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        if samples.is_empty() {
            return Vec::new();
        }

        // Center every frame on its hop position, librosa-style.
        let pad = self.n_fft / 2;
        let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
        for i in (0..pad).rev() {
            padded.push(samples[i.min(samples.len() - 1)]);
        }
        padded.extend_from_slice(samples);
        for i in 0..pad {
            padded.push(samples[samples.len() - 1 - i.min(samples.len() - 1)]);
        }

        let num_frames = (padded.len() - self.n_fft) / self.hop_length + 1;
        let n_bins = self.n_fft / 2 + 1;
        let mut frames = Vec::with_capacity(num_frames);
        let mut buf = vec![Complex32::ZERO; self.n_fft];

        for i in 0..num_frames {
            let start = i * self.hop_length;
            for (dst, (&x, &w)) in buf
                .iter_mut()
                .zip(padded[start..start + self.n_fft].iter().zip(&self.window))
            {
                dst.re = x * w;
                dst.im = 0.0;
            }
            self.fft.process(&mut buf);
            frames.push(buf[..n_bins].iter().map(|c| c.norm_sqr()).collect());
        }

        frames
    }
}

/// In-place power → dB referenced to the peak, floored `DB_TOP` dB below it.
fn power_to_db(frames: &mut [Vec<f32>]) {
    let peak = frames
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(POWER_FLOOR, f32::max);
    let ref_db = 10.0 * peak.log10();

    for frame in frames.iter_mut() {
        for v in frame.iter_mut() {
            let db = 10.0 * v.max(POWER_FLOOR).log10() - ref_db;
            *v = db.max(-DB_TOP);
        }
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filterbank over `n_fft / 2 + 1` linear bins.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let f_max = sample_rate as f32 / 2.0;
    let freq_of_bin: Vec<f32> = (0..n_bins)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mel_max = hz_to_mel(f_max);
    let centers: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut bank = vec![vec![0.0f32; n_bins]; n_mels];
    for (i, filter) in bank.iter_mut().enumerate() {
        let (left, center, right) = (centers[i], centers[i + 1], centers[i + 2]);

        for (bin, amp) in filter.iter_mut().enumerate() {
            let f = freq_of_bin[bin];
            *amp = if f >= left && f < center {
                (f - left) / (center - left)
            } else if f >= center && f <= right {
                (right - f) / (right - center)
            } else {
                0.0
            };
        }

        // Area normalization keeps band energies comparable across widths.
        let sum: f32 = filter.iter().sum();
        if sum > 0.0 {
            for amp in filter.iter_mut() {
                *amp /= sum;
            }
        }
    }

    bank
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

    #[test]
    fn hann_window_shape() {
        let w = hann_window(2048);
        assert!(w[0].abs() < 1e-6);
        assert!(w[1024] > 0.99);
    }

    #[test]
    fn frame_count_tracks_hop_length() {
        let mel = MelSpectrogram::new(22_050, 2_048, 512, 128);
        let frames = mel.power_frames(&tone(440.0, 22_050, 1.0));
        // Center padding: 1 + len / hop frames, within rounding.
        let expected = 1 + 22_050 / 512;
        assert!((frames.len() as i64 - expected as i64).abs() <= 1);
        assert_eq!(frames[0].len(), 128);
    }

    #[test]
    fn db_frames_peak_at_zero_with_floor() {
        let mel = MelSpectrogram::new(22_050, 2_048, 512, 128);
        let frames = mel.db_frames(&tone(440.0, 22_050, 0.5));
        let max = frames
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(f32::MIN, f32::max);
        let min = frames
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(f32::MAX, f32::min);
        assert!(max.abs() < 1e-3, "peak should sit at 0 dB, got {max}");
        assert!(min >= -80.0 - 1e-3);
        assert!(frames.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn tone_energy_lands_in_the_right_band() {
        let mel = MelSpectrogram::new(22_050, 2_048, 512, 128);
        let frames = mel.power_frames(&tone(440.0, 22_050, 0.5));
        let mid = &frames[frames.len() / 2];
        let peak_bin = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // 440 Hz sits low on the mel axis for a 22.05 kHz Nyquist.
        assert!(peak_bin < 40, "expected a low-band peak, got bin {peak_bin}");
    }
}
