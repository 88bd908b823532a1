//! Signal normalization: canonical rate + silence gating.
//!
//! * Resampling uses sinc interpolation (single pass for short clips, chunked
//!   for long ones) so downstream spectral analysis sees one rate only.
//! * Silence removal is a per-sample energy gate. When *nothing* exceeds the
//!   gate the original signal is returned unfiltered – a near-flat clip must
//!   still flow through the pipeline instead of collapsing to zero samples.

use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use super::{AudioError, AudioSample};
use crate::config::AudioConfig;

/// Chunk size for the chunked resampling path.
const CHUNK_SIZE: usize = 1_024;

/// Turns caller-supplied clips into canonical-rate, silence-gated sample
/// buffers.
#[derive(Clone, Debug)]
pub struct SignalNormalizer {
    target_rate: u32,
    silence_threshold: f32,
}

/// Outcome of one normalization pass; the facade turns the bookkeeping fields
/// into trace events.
#[derive(Clone, Debug)]
pub struct Normalized {
    pub samples: Vec<f32>,
    /// Original rate when a resample happened.
    pub resampled_from: Option<u32>,
    /// Samples surviving the gate (equals `total` when bypassed).
    pub kept: usize,
    /// Sample count before gating, after resampling.
    pub total: usize,
    /// True when nothing exceeded the gate and the signal passed unfiltered.
    pub gate_bypassed: bool,
}

impl SignalNormalizer {
    pub fn new(cfg: &AudioConfig) -> Self {
        Self {
            target_rate: cfg.sample_rate,
            silence_threshold: cfg.silence_threshold,
        }
    }

    /// Canonicalize one clip. Fails with [`AudioError::Empty`] on a zero-sample
    /// input; resampler failures surface as [`AudioError::Resample`].
    pub fn normalize(&self, audio: &AudioSample) -> Result<Normalized, AudioError> {
        if audio.samples.is_empty() {
            return Err(AudioError::Empty);
        }

        let (samples, resampled_from) = if audio.sample_rate == self.target_rate {
            (audio.samples.clone(), None)
        } else {
            (
                resample(&audio.samples, audio.sample_rate, self.target_rate)?,
                Some(audio.sample_rate),
            )
        };

        if samples.is_empty() {
            return Err(AudioError::Empty);
        }

        let total = samples.len();
        let gated: Vec<f32> = samples
            .iter()
            .copied()
            .filter(|s| s.abs() > self.silence_threshold)
            .collect();

        let (samples, kept, gate_bypassed) = if gated.is_empty() {
            (samples, total, true)
        } else {
            let kept = gated.len();
            (gated, kept, false)
        };

        Ok(Normalized {
            samples,
            resampled_from,
            kept,
            total,
            gate_bypassed,
        })
    }
}

/// Sinc resample `samples` from `from_sr` to `to_sr`.
pub(crate) fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>, AudioError> {
    if from_sr == to_sr {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if samples.len() <= CHUNK_SIZE * 2 {
        resample_single_pass(samples, from_sr, to_sr)
    } else {
        resample_chunked(samples, from_sr, to_sr)
    }
}

fn sinc_params(sinc_len: usize, window: WindowFunction) -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window,
    }
}

/// Whole clip in one resampler call, plus a flush for the filter tail.
fn resample_single_pass(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>, AudioError> {
    let mut resampler = SincFixedIn::<f32>::new(
        to_sr as f64 / from_sr as f64,
        2.0,
        sinc_params(256, WindowFunction::BlackmanHarris2),
        samples.len(),
        1,
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?
        .into_iter()
        .next()
        .unwrap_or_default();

    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;
    if let Some(tail) = tail.into_iter().next() {
        output.extend(tail);
    }

    Ok(output)
}

/// Fixed-size chunks for long clips; the remainder goes through a partial call.
fn resample_chunked(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>, AudioError> {
    let mut resampler = SincFixedIn::<f32>::new(
        to_sr as f64 / from_sr as f64,
        1.1,
        sinc_params(128, WindowFunction::Blackman2),
        CHUNK_SIZE,
        1,
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let ratio = to_sr as f64 / from_sr as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio * 1.1) as usize);

    let mut pos = 0;
    while pos + CHUNK_SIZE <= samples.len() {
        let input = vec![samples[pos..pos + CHUNK_SIZE].to_vec()];
        let chunk_out = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if let Some(chunk) = chunk_out.into_iter().next() {
            output.extend(chunk);
        }
        pos += CHUNK_SIZE;
    }

    if pos < samples.len() {
        let remainder = vec![samples[pos..].to_vec()];
        let chunk_out = resampler
            .process_partial(Some(remainder.as_slice()), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if let Some(chunk) = chunk_out.into_iter().next() {
            output.extend(chunk);
        }
    }

    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;
    if let Some(tail) = tail.into_iter().next() {
        output.extend(tail);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;

    fn sine(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        let n = (sr as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        let norm = SignalNormalizer::new(&AudioConfig::default());
        let err = norm.normalize(&AudioSample::new(Vec::new(), 22_050)).unwrap_err();
        assert!(matches!(err, AudioError::Empty));
    }

    #[test]
    fn matching_rate_skips_resampling() {
        let norm = SignalNormalizer::new(&AudioConfig::default());
        let audio = AudioSample::new(sine(440.0, 22_050, 0.5), 22_050);
        let out = norm.normalize(&audio).unwrap();
        assert!(out.resampled_from.is_none());
    }

    #[test]
    fn downsampling_roughly_halves_the_length() {
        let samples = sine(440.0, 44_100, 1.0);
        let out = resample(&samples, 44_100, 22_050).unwrap();
        let expected = samples.len() / 2;
        assert!(out.len() > expected * 8 / 10 && out.len() < expected * 12 / 10);
    }

    #[test]
    fn silence_gate_strips_quiet_samples() {
        let norm = SignalNormalizer::new(&AudioConfig::default());
        let mut samples = vec![0.001f32; 1000];
        samples.extend(vec![0.5f32; 200]);
        let out = norm.normalize(&AudioSample::new(samples, 22_050)).unwrap();
        assert_eq!(out.samples.len(), 200);
        assert_eq!(out.kept, 200);
        assert_eq!(out.total, 1200);
        assert!(!out.gate_bypassed);
    }

    #[test]
    fn all_quiet_input_passes_through_unfiltered() {
        let norm = SignalNormalizer::new(&AudioConfig::default());
        let samples = vec![0.001f32; 500];
        let out = norm.normalize(&AudioSample::new(samples.clone(), 22_050)).unwrap();
        assert_eq!(out.samples, samples);
        assert!(out.gate_bypassed);
    }
}
