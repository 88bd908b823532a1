//! In-memory enrollment registry.
//!
//! One [`EnrollmentTemplate`] per identity, each holding the encodings
//! captured at registration time. Insertion order is preserved – classifier
//! class indices are assigned from it, so the registry tracks a `generation`
//! counter that bumps whenever the identity *set* changes and lets callers
//! detect a stale trained model. Durability belongs to the storage
//! collaborator; this registry only holds the working set.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::features::FeatureEncoding;

/// One captured reference sample.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrolledSample {
    pub encoding: FeatureEncoding,
    /// Optional capture-quality score supplied by the collaborator.
    pub confidence: Option<f32>,
    pub recorded_at: Option<SystemTime>,
}

impl EnrolledSample {
    pub fn new(encoding: FeatureEncoding) -> Self {
        Self {
            encoding,
            confidence: None,
            recorded_at: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_timestamp(mut self, recorded_at: SystemTime) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }
}

/// All reference samples for one identity.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnrollmentTemplate {
    samples: Vec<EnrolledSample>,
}

impl EnrollmentTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: EnrolledSample) {
        self.samples.push(sample);
    }

    pub fn encodings(&self) -> impl Iterator<Item = &FeatureEncoding> {
        self.samples.iter().map(|s| &s.encoding)
    }

    pub fn samples(&self) -> &[EnrolledSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Registry of identities → templates, insertion-ordered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TemplateStore {
    templates: IndexMap<String, EnrollmentTemplate>,
    generation: u64,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample for `identity`, creating its template on first use.
    /// Creating a new identity changes the class set and bumps `generation`.
    pub fn enroll(&mut self, identity: &str, sample: EnrolledSample) {
        match self.templates.get_mut(identity) {
            Some(template) => template.push(sample),
            None => {
                let mut template = EnrollmentTemplate::new();
                template.push(sample);
                self.templates.insert(identity.to_owned(), template);
                self.generation += 1;
            }
        }
    }

    /// Drop an identity and its samples. Returns false when it was unknown.
    pub fn remove(&mut self, identity: &str) -> bool {
        // shift_remove keeps the class ordering of the remaining identities
        // deterministic.
        let removed = self.templates.shift_remove(identity).is_some();
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn get(&self, identity: &str) -> Option<&EnrollmentTemplate> {
        self.templates.get(identity)
    }

    /// An identity is eligible for verification once it has ≥1 encoding.
    pub fn eligible(&self, identity: &str) -> bool {
        self.get(identity).is_some_and(|t| !t.is_empty())
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnrollmentTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Bumped on every identity-set change; trained models record the value
    /// they were built against.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(v: f32) -> FeatureEncoding {
        FeatureEncoding::from_flat(1, 2, vec![v, v]).unwrap()
    }

    #[test]
    fn enrolling_new_identity_bumps_generation() {
        let mut store = TemplateStore::new();
        assert_eq!(store.generation(), 0);

        store.enroll("ada", EnrolledSample::new(enc(0.1)));
        assert_eq!(store.generation(), 1);

        // More samples for the same identity leave the class set unchanged.
        store.enroll("ada", EnrolledSample::new(enc(0.2)));
        assert_eq!(store.generation(), 1);
        assert_eq!(store.get("ada").unwrap().len(), 2);

        store.enroll("grace", EnrolledSample::new(enc(0.3)));
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn removal_bumps_generation_and_preserves_order() {
        let mut store = TemplateStore::new();
        for name in ["ada", "grace", "edsger"] {
            store.enroll(name, EnrolledSample::new(enc(0.5)));
        }
        assert!(store.remove("grace"));
        assert!(!store.remove("grace"));
        assert_eq!(store.generation(), 4);

        let order: Vec<&str> = store.identities().collect();
        assert_eq!(order, vec!["ada", "edsger"]);
    }

    #[test]
    fn eligibility_needs_at_least_one_encoding() {
        let mut store = TemplateStore::new();
        assert!(!store.eligible("ada"));
        store.enroll("ada", EnrolledSample::new(enc(0.1)));
        assert!(store.eligible("ada"));
    }
}
