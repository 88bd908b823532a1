//! Cepstral coefficient extraction.
//!
//! Log mel energies → orthonormal DCT-II, keeping the first `n_coeffs`
//! coefficients (energy coefficient included). Shares the mel front-end with
//! the spectrogram mode so both see identical framing.

use super::mel::MelSpectrogram;
use crate::constants::POWER_FLOOR;

/// DCT-II cepstral front-end over a shared [`MelSpectrogram`].
pub struct CepstralExtractor {
    n_coeffs: usize,
    // cos((pi / n_mels) * (m + 0.5) * k) table, [k][m]
    dct_basis: Vec<Vec<f32>>,
}

impl CepstralExtractor {
    pub fn new(n_mels: usize, n_coeffs: usize) -> Self {
        let n = n_mels as f32;
        let ortho_0 = (1.0 / n).sqrt();
        let ortho_k = (2.0 / n).sqrt();

        let dct_basis = (0..n_coeffs)
            .map(|k| {
                let scale = if k == 0 { ortho_0 } else { ortho_k };
                (0..n_mels)
                    .map(|m| {
                        scale
                            * ((std::f32::consts::PI / n) * (m as f32 + 0.5) * k as f32).cos()
                    })
                    .collect()
            })
            .collect();

        Self { n_coeffs, dct_basis }
    }

    pub fn n_coeffs(&self) -> usize {
        self.n_coeffs
    }

    /// Cepstral frames, `[frame][coeff]`.
    pub fn frames(&self, mel: &MelSpectrogram, samples: &[f32]) -> Vec<Vec<f32>> {
        mel.power_frames(samples)
            .into_iter()
            .map(|energies| {
                let log_e: Vec<f32> = energies
                    .iter()
                    .map(|&e| e.max(POWER_FLOOR).ln())
                    .collect();
                self.dct_basis
                    .iter()
                    .map(|basis| basis.iter().zip(&log_e).map(|(b, e)| b * e).sum())
                    .collect()
            })
            .collect()
    }
}
