//! Fixed-shape feature container.
//!
//! Every encoding the pipeline produces has the same `frames × bins` shape so
//! templates compare directly and classifier batches stack without ragged
//! handling. Fitting to the fixed frame count is lossy on purpose: frames past
//! the canonical length are dropped (long utterances lose tail information)
//! and short clips are zero-padded at the end.

use serde::{Deserialize, Serialize};

/// Immutable `frames × bins` matrix of spectral features, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoding {
    frames: usize,
    bins: usize,
    data: Vec<f32>,
}

impl FeatureEncoding {
    /// Build from time-major rows, truncating/zero-padding to `target_frames`.
    ///
    /// Returns `None` on empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<f32>>, target_frames: usize) -> Option<Self> {
        let bins = rows.first()?.len();
        if bins == 0 || rows.iter().any(|r| r.len() != bins) {
            return None;
        }

        let mut data = Vec::with_capacity(target_frames * bins);
        for row in rows.into_iter().take(target_frames) {
            data.extend(row);
        }
        data.resize(target_frames * bins, 0.0);

        Some(Self {
            frames: target_frames,
            bins,
            data,
        })
    }

    /// Rebuild from flat row-major data, e.g. when a storage collaborator
    /// hands persisted features back in. `None` when the length disagrees
    /// with the shape.
    pub fn from_flat(frames: usize, bins: usize, data: Vec<f32>) -> Option<Self> {
        if frames == 0 || bins == 0 || data.len() != frames * bins {
            return None;
        }
        Some(Self { frames, bins, data })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.bins)
    }

    /// Flat row-major view, `frames * bins` long.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, frame: usize) -> &[f32] {
        let start = frame * self.bins;
        &self.data[start..start + self.bins]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_input_truncates_to_target() {
        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32; 3]).collect();
        let enc = FeatureEncoding::from_rows(rows, 4).unwrap();
        assert_eq!(enc.shape(), (4, 3));
        assert_eq!(enc.row(3), &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn short_input_zero_pads_the_tail() {
        let rows = vec![vec![1.0, 2.0]];
        let enc = FeatureEncoding::from_rows(rows, 3).unwrap();
        assert_eq!(enc.shape(), (3, 2));
        assert_eq!(enc.row(0), &[1.0, 2.0]);
        assert_eq!(enc.row(1), &[0.0, 0.0]);
        assert_eq!(enc.row(2), &[0.0, 0.0]);
    }

    #[test]
    fn ragged_rows_are_refused() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(FeatureEncoding::from_rows(rows, 2).is_none());
    }

    #[test]
    fn flat_length_must_match_shape() {
        assert!(FeatureEncoding::from_flat(2, 2, vec![0.0; 4]).is_some());
        assert!(FeatureEncoding::from_flat(2, 2, vec![0.0; 3]).is_none());
        assert!(FeatureEncoding::from_flat(0, 2, Vec::new()).is_none());
    }
}
