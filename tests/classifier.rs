//! End-to-end tests for classifier training, publication and staleness.
//
//   cargo test --test classifier
//

use voxgate::{
    Decision, EnrolledSample, FeatureEncoding, ModelLoad, ModelSave, SpeakerModel, TrainError,
    TrainOptions, VoxError, VoxGate, VoxGateConfig,
};

/* ───────────────────────────── helpers ────────────────────────────── */

/// Small deterministic encoding; classifier shape is taken from the data, so
/// tests can train on compact inputs regardless of the configured pipeline.
fn patterned(seed: u32) -> FeatureEncoding {
    let (frames, bins) = (16, 16);
    let data: Vec<f32> = (0..frames * bins)
        .map(|i| {
            let (f, b) = (i / bins, i % bins);
            (((f as u32 + 1) * (b as u32 + 3) * (seed + 1)) % 13) as f32 - 6.0
        })
        .collect();
    FeatureEncoding::from_flat(frames, bins, data).expect("encoding")
}

fn enrolled_gate() -> VoxGate {
    let mut g = VoxGate::new(VoxGateConfig::default());
    for seed in 0..3 {
        g.enroll_sample("ada", EnrolledSample::new(patterned(seed)));
        g.enroll_sample("grace", EnrolledSample::new(patterned(seed + 40)));
    }
    g
}

fn quick_opts() -> TrainOptions {
    TrainOptions {
        epochs: 10,
        batch_size: 4,
        ..TrainOptions::default()
    }
}

/* ───────────────────────── training guard ──────────────────────────── */

#[test]
fn training_needs_two_identities() {
    let mut g = VoxGate::new(VoxGateConfig::default());
    g.enroll_sample("ada", EnrolledSample::new(patterned(1)));

    let err = g.train_classifier(&quick_opts()).unwrap_err();
    assert!(matches!(
        err,
        VoxError::Train(TrainError::InsufficientTrainingData { got: 1 })
    ));
}

#[test]
fn two_identities_with_one_sample_each_still_train() {
    let mut g = VoxGate::new(VoxGateConfig::default());
    g.enroll_sample("ada", EnrolledSample::new(patterned(2)));
    g.enroll_sample("grace", EnrolledSample::new(patterned(50)));

    let model = g.train_classifier(&quick_opts()).expect("model");
    assert_eq!(model.identities, vec!["ada", "grace"]);

    g.publish_model(&model).expect("publish");
    let pred = g
        .classify(&patterned(2))
        .expect("classify")
        .expect("prediction");
    assert!(model.identities.contains(&pred.identity));
    // Two classes: the softmax max is a sane confidence, not noise.
    assert!(pred.confidence >= 0.5 && pred.confidence <= 1.0);
    assert_eq!(pred.is_confident, pred.confidence >= 0.7);
}

/* ───────────────────────── publication lifecycle ───────────────────── */

#[test]
fn classify_without_a_model_is_explicitly_absent() {
    let g = enrolled_gate();
    assert!(g.classify(&patterned(0)).expect("classify").is_none());
    assert!(!g.classifier_is_stale());
}

#[test]
fn published_model_serves_and_survives_a_failed_retrain() {
    let mut g = enrolled_gate();
    let model = g.train_classifier(&quick_opts()).expect("model");
    g.publish_model(&model).expect("publish");
    assert!(g.classify(&patterned(0)).expect("classify").is_some());

    // Shrink the registry below the training minimum: retraining now fails,
    // but the previously published model keeps serving.
    g.remove_identity("grace");
    assert!(g.train_classifier(&quick_opts()).is_err());
    assert!(g.classify(&patterned(0)).expect("classify").is_some());
}

#[test]
fn identity_set_changes_mark_the_model_stale() {
    let mut g = enrolled_gate();
    let model = g.train_classifier(&quick_opts()).expect("model");
    g.publish_model(&model).expect("publish");
    assert!(!g.classifier_is_stale());

    // More samples for a known identity keep the class set intact…
    g.enroll_sample("ada", EnrolledSample::new(patterned(9)));
    assert!(!g.classifier_is_stale());

    // …a brand-new identity does not.
    g.enroll_sample("edsger", EnrolledSample::new(patterned(77)));
    assert!(g.classifier_is_stale());
}

#[test]
fn advisory_classifier_never_overrides_similarity() {
    let mut g = enrolled_gate();
    let model = g.train_classifier(&quick_opts()).expect("model");
    g.publish_model(&model).expect("publish");

    // Probe far from every template: similarity rejects whatever the
    // classifier would have said.
    let zero = FeatureEncoding::from_flat(16, 16, vec![0.0; 256]).expect("zero");
    let result = g.identify_encoding(&zero);
    assert_eq!(result.decision, Decision::Reject);
}

/* ───────────────────────── persistence round-trip ──────────────────── */

#[test]
fn model_round_trips_through_the_container() {
    let mut g = enrolled_gate();
    let model = g.train_classifier(&quick_opts()).expect("model");
    g.publish_model(&model).expect("publish original");

    let buf = model.save_to_buffer().expect("serialize");
    let loaded = SpeakerModel::load_from_buffer(&buf).expect("deserialize");
    assert_eq!(loaded.identities, model.identities);
    assert_eq!(loaded.input_shape, model.input_shape);
    assert_eq!(loaded.trained_generation, model.trained_generation);

    // The reloaded model publishes and predicts like the original.
    let mut g2 = VoxGate::new(VoxGateConfig::default());
    g2.publish_model(&loaded).expect("publish reloaded");
    let a = g.classify(&patterned(1)).expect("original");
    let b = g2.classify(&patterned(1)).expect("reloaded");
    match (a, b) {
        (Some(a), Some(b)) => {
            assert_eq!(a.class_index, b.class_index);
            approx::assert_abs_diff_eq!(a.confidence, b.confidence, epsilon = 1e-5);
        }
        _ => panic!("original gate had no classifier published"),
    }
}
