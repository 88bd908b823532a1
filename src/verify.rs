//! Verification policy: thresholds → decisions, attempts → audit events.
//!
//! Two operating modes share one score scale:
//! * **closed-set** – a claimed identity against its own template, accept or
//!   reject at a single threshold;
//! * **open-set** – the best-ranked identity against tiered thresholds, where
//!   the middle tier surfaces a tentative match for audit without granting
//!   access.
//!
//! Every attempt is reported to an injected [`AttemptSink`]; unmatched
//! open-set attempts report under the `"unknown"` sentinel instead of being
//! dropped.

use serde::{Deserialize, Serialize};

use crate::config::VerifyConfig;
use crate::constants::UNKNOWN_IDENTITY;

/// Outcome tier of one verification attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Score cleared the accept threshold; access may be granted.
    Accept,
    /// Open-set middle tier: a tentative identity worth surfacing, no access.
    PossibleMatch,
    Reject,
}

/// Result of one attempt. Produced fresh per call and never persisted here –
/// a collaborator logs it via [`AttemptSink`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub decision: Decision,
    /// Matched (or tentatively matched) identity; `None` on reject.
    pub identity: Option<String>,
    pub score: f32,
}

/// Audit record for one attempt, accepted or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// Identity under test, or [`UNKNOWN_IDENTITY`] for unmatched attempts.
    pub identity: String,
    pub accepted: bool,
    pub score: f32,
}

/// Storage-collaborator boundary for attempt events.
pub trait AttemptSink: Send + Sync {
    fn record(&self, event: &AttemptEvent);
}

/// Threshold logic shared by both operating modes.
#[derive(Clone, Debug)]
pub struct VerificationPolicy {
    cfg: VerifyConfig,
}

impl VerificationPolicy {
    pub fn new(cfg: VerifyConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.cfg
    }

    /// Closed-set: the caller claimed `identity` and scored `score` against
    /// that identity's own template.
    pub fn closed_set(&self, identity: &str, score: f32) -> VerificationResult {
        if score >= self.cfg.accept_threshold {
            VerificationResult {
                decision: Decision::Accept,
                identity: Some(identity.to_owned()),
                score,
            }
        } else {
            VerificationResult {
                decision: Decision::Reject,
                identity: None,
                score,
            }
        }
    }

    /// Open-set: `ranked` is the [`crate::similarity::rank_all`] output, best
    /// first. An empty ranking (nobody enrolled) always rejects.
    pub fn open_set(&self, ranked: &[(&str, f32)]) -> VerificationResult {
        let Some(&(identity, score)) = ranked.first() else {
            return VerificationResult {
                decision: Decision::Reject,
                identity: None,
                score: 0.0,
            };
        };

        if score >= self.cfg.identify_accept_threshold {
            VerificationResult {
                decision: Decision::Accept,
                identity: Some(identity.to_owned()),
                score,
            }
        } else if score >= self.cfg.identify_possible_threshold {
            VerificationResult {
                decision: Decision::PossibleMatch,
                identity: Some(identity.to_owned()),
                score,
            }
        } else {
            VerificationResult {
                decision: Decision::Reject,
                identity: None,
                score,
            }
        }
    }

    /// Audit event for a closed-set attempt: always under the claimed
    /// identity.
    pub fn closed_set_event(&self, claimed: &str, result: &VerificationResult) -> AttemptEvent {
        AttemptEvent {
            identity: claimed.to_owned(),
            accepted: result.decision == Decision::Accept,
            score: result.score,
        }
    }

    /// Audit event for an open-set attempt: the matched or tentative identity
    /// when there is one, the `"unknown"` sentinel otherwise.
    pub fn open_set_event(&self, result: &VerificationResult) -> AttemptEvent {
        AttemptEvent {
            identity: result
                .identity
                .clone()
                .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned()),
            accepted: result.decision == Decision::Accept,
            score: result.score,
        }
    }
}
