//! voxgate – public crate root
//! ===========================
//! Speaker-verification core: mel/cepstral front-end + Candle classifier
//! back-end.
//!
//! The library is **self-contained**: hand it mono PCM clips, it answers with
//! accept / possible-match / reject decisions against enrolled voice
//! templates. Collaborators own capture, storage and presentation; the core
//! exchanges plain in-memory values at those boundaries.
//!
//! Pipeline: raw audio → [`audio::SignalNormalizer`] →
//! [`features::FeatureExtractor`] → [`similarity`] against enrolled templates
//! (and, optionally, [`classifier`] inference) → [`verify::VerificationPolicy`]
//! → decision + score.

#![deny(unsafe_code)]

/* ────────────────────────  sub-modules  ─────────────────────────────── */
pub mod audio;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod enroll;
mod error;
pub mod features;
pub mod similarity;
pub mod trace;
pub mod verify;

/* ────────── public façade & re-exports ─────────────────────────────── */
pub use audio::{AudioError, AudioSample, SignalNormalizer};
pub use classifier::{
    ClassifierError, ModelLoad, ModelSave, Prediction, SpeakerClassifier, SpeakerModel,
    TrainError, TrainOptions,
};
pub use config::{AudioConfig, FeatureConfig, FeatureKind, VerifyConfig, VoxGateConfig};
pub use constants::*;
pub use enroll::{EnrolledSample, EnrollmentTemplate, TemplateStore};
pub use error::VoxError;
pub use features::{Extraction, FeatureEncoding, FeatureExtractor};
pub use trace::{LogSink, NullSink, TraceEvent, TraceSink};
pub use verify::{AttemptEvent, AttemptSink, Decision, VerificationPolicy, VerificationResult};

use std::sync::Arc;

use audio::Normalized;

/* ───────────────────────── main facade ─────────────────────────────── */

/// **VoxGate** – instant-use speaker verifier.
///
/// Build with [`VoxGate::new`], enroll identities with [`enroll`], then feed
/// probe clips through [`verify`] (claimed identity) or [`identify`]
/// (open-set identification).
///
/// A single gate is single-threaded; concurrent attempts belong in separate
/// instances or behind external synchronization. A published
/// classifier is shared as an immutable [`Arc`] snapshot, so retraining never
/// disturbs in-flight inference.
///
/// [`enroll`]: VoxGate::enroll
/// [`verify`]: VoxGate::verify
/// [`identify`]: VoxGate::identify
pub struct VoxGate {
    /* ---------- config (immutable after ctor) ---------- */
    config: VoxGateConfig,

    /* ----------------- pipeline helpers ---------------- */
    normalizer: SignalNormalizer,
    extractor: FeatureExtractor,
    policy: VerificationPolicy,

    /* ----------------- runtime state -------------------- */
    templates: TemplateStore,
    classifier: Option<Arc<SpeakerClassifier>>,
    attempt_sink: Option<Box<dyn AttemptSink>>,
    trace: Box<dyn TraceSink>,
}

impl VoxGate {
    /// Build a new gate from a [`VoxGateConfig`].
    pub fn new(config: VoxGateConfig) -> Self {
        let normalizer = SignalNormalizer::new(&config.audio);
        let extractor = FeatureExtractor::new(config.audio.sample_rate, config.feature.clone());
        let policy = VerificationPolicy::new(config.verify.clone());
        Self {
            config,
            normalizer,
            extractor,
            policy,
            templates: TemplateStore::new(),
            classifier: None,
            attempt_sink: None,
            trace: Box::new(LogSink),
        }
    }

    /// Route attempt events to a storage collaborator.
    pub fn set_attempt_sink(&mut self, sink: Box<dyn AttemptSink>) {
        self.attempt_sink = Some(sink);
    }

    /// Replace the trace collector (default: `log`-backed).
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = sink;
    }

    pub fn config(&self) -> &VoxGateConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    //  Extraction
    // ------------------------------------------------------------------

    /// Normalize one clip and extract its encoding, walking the fallback
    /// chain when the configured mode fails.
    pub fn process(&self, clip: &AudioSample) -> Result<FeatureEncoding, VoxError> {
        Ok(self.process_traced(clip)?.encoding)
    }

    fn process_traced(&self, clip: &AudioSample) -> Result<Extraction, VoxError> {
        let Normalized {
            samples,
            resampled_from,
            kept,
            total,
            gate_bypassed,
        } = self.normalizer.normalize(clip)?;

        if let Some(from) = resampled_from {
            self.trace.emit(&TraceEvent::Resampled {
                from,
                to: self.config.audio.sample_rate,
            });
        }
        if gate_bypassed {
            self.trace.emit(&TraceEvent::SilenceGateBypassed { total });
        } else {
            self.trace.emit(&TraceEvent::SilenceStripped { kept, total });
        }

        let extraction = self
            .extractor
            .extract_with_fallback(&samples)
            .ok_or(VoxError::Extraction)?;

        if let Some(from) = extraction.fell_back_from {
            self.trace.emit(&TraceEvent::ExtractionFellBack {
                from,
                to: extraction.kind,
            });
        }
        self.trace.emit(&TraceEvent::FeaturesExtracted {
            kind: extraction.kind,
            frames: extraction.encoding.frames(),
            bins: extraction.encoding.bins(),
            degraded: extraction.degraded,
        });

        Ok(extraction)
    }

    // ------------------------------------------------------------------
    //  Enrollment
    // ------------------------------------------------------------------

    /// Capture one reference clip for `identity`. Returns the stored encoding
    /// so the storage collaborator can persist it.
    pub fn enroll(&mut self, identity: &str, clip: &AudioSample) -> Result<FeatureEncoding, VoxError> {
        let encoding = self.process(clip)?;
        self.templates
            .enroll(identity, EnrolledSample::new(encoding.clone()));
        Ok(encoding)
    }

    /// Feed a persisted sample back into the registry.
    pub fn enroll_sample(&mut self, identity: &str, sample: EnrolledSample) {
        self.templates.enroll(identity, sample);
    }

    /// Drop an identity; any published classifier becomes stale.
    pub fn remove_identity(&mut self, identity: &str) -> bool {
        self.templates.remove(identity)
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    // ------------------------------------------------------------------
    //  Verification
    // ------------------------------------------------------------------

    /// Closed-set verification of a claimed identity from raw audio.
    pub fn verify(&self, claimed: &str, clip: &AudioSample) -> Result<VerificationResult, VoxError> {
        let encoding = self.process(clip)?;
        Ok(self.verify_encoding(claimed, &encoding))
    }

    /// Closed-set verification from an already-extracted encoding.
    ///
    /// An unenrolled or empty claimed identity scores 0.0 and rejects; a bad
    /// claim is a rejection, not a fault.
    pub fn verify_encoding(&self, claimed: &str, encoding: &FeatureEncoding) -> VerificationResult {
        let score = match self.templates.get(claimed) {
            Some(template) if !template.is_empty() => similarity::best_match(encoding, template),
            _ => 0.0,
        };
        self.trace.emit(&TraceEvent::Compared {
            identity: claimed.to_owned(),
            score,
        });

        let result = self.policy.closed_set(claimed, score);
        self.report(self.policy.closed_set_event(claimed, &result));
        result
    }

    /// Open-set identification from raw audio: which enrolled identity, if
    /// any, does this clip belong to?
    pub fn identify(&self, clip: &AudioSample) -> Result<VerificationResult, VoxError> {
        let encoding = self.process(clip)?;
        Ok(self.identify_encoding(&encoding))
    }

    /// Open-set identification from an already-extracted encoding.
    pub fn identify_encoding(&self, encoding: &FeatureEncoding) -> VerificationResult {
        let ranked = similarity::rank_all(encoding, &self.templates);
        for (identity, score) in &ranked {
            self.trace.emit(&TraceEvent::Compared {
                identity: (*identity).to_owned(),
                score: *score,
            });
        }

        // Advisory only: the classifier never decides, similarity does.
        if let Some(classifier) = &self.classifier
            && let Ok(prediction) = classifier.predict(encoding)
        {
            self.trace.emit(&TraceEvent::ClassifierAdvisory {
                identity: prediction.identity,
                confidence: prediction.confidence,
                confident: prediction.is_confident,
            });
        }

        let result = self.policy.open_set(&ranked);
        self.report(self.policy.open_set_event(&result));
        result
    }

    /// Rank every enrolled identity against a probe encoding, best first.
    pub fn rank(&self, encoding: &FeatureEncoding) -> Vec<(String, f32)> {
        similarity::rank_all(encoding, &self.templates)
            .into_iter()
            .map(|(id, score)| (id.to_owned(), score))
            .collect()
    }

    // ------------------------------------------------------------------
    //  Classifier lifecycle
    // ------------------------------------------------------------------

    /// Train a fresh model from the current enrollment snapshot. Nothing is
    /// published until [`VoxGate::publish_model`]; a failed run leaves any
    /// existing model untouched.
    pub fn train_classifier(&self, opts: &TrainOptions) -> Result<SpeakerModel, VoxError> {
        Ok(classifier::train(
            &self.templates,
            self.config.feature.kind,
            opts,
        )?)
    }

    /// Publish a trained model: new inference requests see it immediately,
    /// in-flight ones keep their previous snapshot.
    pub fn publish_model(&mut self, model: &SpeakerModel) -> Result<(), VoxError> {
        let classifier = SpeakerClassifier::from_model(
            model,
            self.config.verify.classifier_confidence_threshold,
        )?;
        self.classifier = Some(Arc::new(classifier));
        Ok(())
    }

    /// The currently published classifier snapshot, if any.
    pub fn classifier(&self) -> Option<&Arc<SpeakerClassifier>> {
        self.classifier.as_ref()
    }

    /// Secondary identification signal. `Ok(None)` when no model has been
    /// published – callers dispatch on the option instead of probing.
    pub fn classify(&self, encoding: &FeatureEncoding) -> Result<Option<Prediction>, VoxError> {
        match &self.classifier {
            Some(classifier) => Ok(Some(classifier.predict(encoding)?)),
            None => Ok(None),
        }
    }

    /// True when the identity set changed after the published model was
    /// trained; class indices can no longer be trusted and a retrain is due.
    pub fn classifier_is_stale(&self) -> bool {
        self.classifier
            .as_ref()
            .is_some_and(|c| c.trained_generation() != self.templates.generation())
    }

    fn report(&self, event: AttemptEvent) {
        if let Some(sink) = &self.attempt_sink {
            sink.record(&event);
        }
    }
}
