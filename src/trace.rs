//! Structured observability boundary.
//!
//! The pipeline reports what it did through [`TraceEvent`] values handed to an
//! injected [`TraceSink`]; it never formats log lines inside business logic.
//! The default sink forwards to the `log` facade at debug level.

use crate::config::FeatureKind;

/// One step of a normalization / extraction / matching pass.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// Samples surviving the silence gate.
    SilenceStripped { kept: usize, total: usize },
    /// Nothing exceeded the gate; the unfiltered signal was kept instead.
    SilenceGateBypassed { total: usize },
    /// Input was resampled to the canonical rate.
    Resampled { from: u32, to: u32 },
    /// An encoding was produced.
    FeaturesExtracted {
        kind: FeatureKind,
        frames: usize,
        bins: usize,
        degraded: bool,
    },
    /// The configured mode failed and another mode was attempted.
    ExtractionFellBack { from: FeatureKind, to: FeatureKind },
    /// A probe was scored against one enrolled identity.
    Compared { identity: String, score: f32 },
    /// Advisory prediction from a published classifier (never decisive).
    ClassifierAdvisory {
        identity: String,
        confidence: f32,
        confident: bool,
    },
}

/// Collector for [`TraceEvent`]s. Implementations must be cheap; the pipeline
/// emits on the hot path.
pub trait TraceSink: Send + Sync {
    fn emit(&self, event: &TraceEvent);
}

/// Default sink: forwards every event to `log::debug!`.
#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn emit(&self, event: &TraceEvent) {
        log::debug!(target: "voxgate", "{event:?}");
    }
}

/// Sink that drops everything; handy in benchmarks and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&self, _event: &TraceEvent) {}
}
