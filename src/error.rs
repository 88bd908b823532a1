//! Facade error type.
//!
//! Each subsystem keeps its own `thiserror` enum close to the code that
//! raises it; this wrapper aggregates them for the [`crate::VoxGate`] entry
//! points so callers can `?` through a single type.

use thiserror::Error;

use crate::audio::AudioError;
use crate::classifier::{ClassifierError, TrainError};

/// Any failure surfaced by the `VoxGate` facade.
#[derive(Debug, Error)]
pub enum VoxError {
    /// Audio could not be decoded, was empty, or failed to resample.
    #[error("audio: {0}")]
    Audio(#[from] AudioError),

    /// Every extraction mode in the fallback chain produced nothing.
    #[error("feature extraction failed for all configured modes")]
    Extraction,

    /// Classifier training failed; any previously published model is intact.
    #[error("training: {0}")]
    Train(#[from] TrainError),

    /// A published classifier rejected the request.
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
}
