//! Cosine similarity over feature encodings.
//!
//! Scores live in `[0, 1]`. Two situations score a hard 0.0 instead of
//! raising: mismatched shapes (different feature configurations are defined
//! as non-comparable) and zero-norm inputs (silence must never falsely
//! match). A failed comparison therefore degrades to a rejection downstream
//! while staying distinguishable in traces.

use crate::enroll::{EnrollmentTemplate, TemplateStore};
use crate::features::FeatureEncoding;

/// Cosine similarity between two flattened encodings, clamped to `[0, 1]`.
pub fn compare(a: &FeatureEncoding, b: &FeatureEncoding) -> f32 {
    if a.shape() != b.shape() {
        return 0.0;
    }
    cosine(a.as_slice(), b.as_slice()).max(0.0)
}

/// Best score of a probe against every encoding in a template.
///
/// Maximum, never an average: enrollment samples vary in quality and one
/// excellent match should represent the identity.
pub fn best_match(probe: &FeatureEncoding, template: &EnrollmentTemplate) -> f32 {
    template
        .encodings()
        .map(|enrolled| compare(probe, enrolled))
        .fold(0.0, f32::max)
}

/// Every enrolled identity scored against the probe, best first.
pub fn rank_all<'a>(probe: &FeatureEncoding, store: &'a TemplateStore) -> Vec<(&'a str, f32)> {
    let mut ranked: Vec<(&str, f32)> = store
        .iter()
        .filter(|(_, template)| !template.is_empty())
        .map(|(identity, template)| (identity, best_match(probe, template)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enroll::EnrolledSample;

    fn enc(data: Vec<f32>) -> FeatureEncoding {
        let bins = data.len();
        FeatureEncoding::from_flat(1, bins, data).unwrap()
    }

    #[test]
    fn identical_encodings_score_one() {
        let a = enc(vec![0.3, -0.2, 0.9, 0.1]);
        assert!((compare(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = enc(vec![0.5, 0.1, -0.4]);
        let b = enc(vec![-0.2, 0.8, 0.3]);
        assert_eq!(compare(&a, &b), compare(&b, &a));
    }

    #[test]
    fn zero_norm_scores_exactly_zero() {
        let zero = enc(vec![0.0; 8]);
        let other = enc(vec![1.0; 8]);
        let score = compare(&zero, &other);
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
        assert_eq!(compare(&zero, &zero), 0.0);
    }

    #[test]
    fn mismatched_shapes_score_zero_not_error() {
        let a = enc(vec![1.0; 4]);
        let b = FeatureEncoding::from_flat(2, 3, vec![1.0; 6]).unwrap();
        assert_eq!(compare(&a, &b), 0.0);
    }

    #[test]
    fn opposite_vectors_clamp_to_zero() {
        let a = enc(vec![1.0, 1.0]);
        let b = enc(vec![-1.0, -1.0]);
        assert_eq!(compare(&a, &b), 0.0);
    }

    #[test]
    fn best_match_takes_the_maximum_not_the_mean() {
        let probe = enc(vec![1.0, 0.0]);
        let mut template = EnrollmentTemplate::new();
        // Cosines vs probe: 0.3, 0.9, 0.5.
        for c in [0.3f32, 0.9, 0.5] {
            let s = (1.0 - c * c).sqrt();
            template.push(EnrolledSample::new(enc(vec![c, s])));
        }
        let score = best_match(&probe, &template);
        assert!((score - 0.9).abs() < 1e-5, "got {score}");
    }

    #[test]
    fn rank_all_orders_by_descending_score() {
        let probe = enc(vec![1.0, 0.0]);
        let mut store = TemplateStore::new();
        for (name, c) in [("low", 0.2f32), ("high", 0.95), ("mid", 0.6)] {
            let s = (1.0 - c * c).sqrt();
            store.enroll(name, EnrolledSample::new(enc(vec![c, s])));
        }
        let ranked = rank_all(&probe, &store);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }
}
