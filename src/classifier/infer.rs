//! Inference over a published [`SpeakerModel`].
//!
//! A [`SpeakerClassifier`] is rebuilt from the immutable model value and is
//! itself immutable – retraining publishes a *new* classifier instead of
//! mutating one in use, so in-flight predictions always see a consistent
//! snapshot. Class indices resolve through the identity list persisted in the
//! model, never through live enrollment order.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops, VarBuilder, VarMap};
use thiserror::Error;

use super::model::{SpeakerModel, MODEL_VERSION};
use super::nn::SpeakerCnn;
use super::train::arg_max;
use crate::config::FeatureKind;
use crate::features::FeatureEncoding;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model container version {got} unsupported (expected {expected})")]
    Version { got: u8, expected: u8 },

    #[error("model lists no identities")]
    NoIdentities,

    #[error("model weight '{0}' missing from checkpoint")]
    MissingWeight(String),

    #[error("encoding shape {got:?} does not match model input {expected:?}")]
    ShapeMismatch {
        got: (usize, usize),
        expected: (usize, usize),
    },

    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("weight load poisoned: {0}")]
    Poison(String),
}

/// One classifier answer. Confidence is the softmax max – a ranking signal,
/// not a calibrated probability of identity correctness.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub identity: String,
    pub confidence: f32,
    pub is_confident: bool,
}

/// Ready-to-serve classifier built from a trained model.
pub struct SpeakerClassifier {
    net: SpeakerCnn,
    identities: Vec<String>,
    input_shape: (usize, usize),
    feature_kind: FeatureKind,
    trained_generation: u64,
    confidence_threshold: f32,
}

impl SpeakerClassifier {
    /// Rebuild the network and load the checkpoint weights.
    pub fn from_model(
        model: &SpeakerModel,
        confidence_threshold: f32,
    ) -> Result<Self, ClassifierError> {
        if model.version() != MODEL_VERSION {
            return Err(ClassifierError::Version {
                got: model.version(),
                expected: MODEL_VERSION,
            });
        }
        if model.identities.is_empty() {
            return Err(ClassifierError::NoIdentities);
        }

        let dev = Device::Cpu;
        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, DType::F32, &dev);
        let net = SpeakerCnn::new(vb, model.identities.len())?;

        {
            let mut guard = var_map
                .data()
                .lock()
                .map_err(|e| ClassifierError::Poison(e.to_string()))?;
            for (name, var) in guard.iter_mut() {
                let td = model
                    .weights
                    .get(name)
                    .ok_or_else(|| ClassifierError::MissingWeight(name.clone()))?;
                let tensor = Tensor::from_vec(td.values.clone(), td.dims.as_slice(), &dev)?;
                var.set(&tensor)?;
            }
        }

        Ok(Self {
            net,
            identities: model.identities.clone(),
            input_shape: model.input_shape,
            feature_kind: model.feature_kind,
            trained_generation: model.trained_generation,
            confidence_threshold,
        })
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    pub fn feature_kind(&self) -> FeatureKind {
        self.feature_kind
    }

    pub fn trained_generation(&self) -> u64 {
        self.trained_generation
    }

    /// Classify one encoding.
    pub fn predict(&self, encoding: &FeatureEncoding) -> Result<Prediction, ClassifierError> {
        if encoding.shape() != self.input_shape {
            return Err(ClassifierError::ShapeMismatch {
                got: encoding.shape(),
                expected: self.input_shape,
            });
        }

        let (frames, bins) = self.input_shape;
        let xs = Tensor::from_vec(
            encoding.as_slice().to_vec(),
            (1, 1, frames, bins),
            &Device::Cpu,
        )?;

        let logits = self.net.forward_t(&xs, false)?;
        let probs = ops::softmax(&logits, D::Minus1)?.get(0)?.to_vec1::<f32>()?;

        let class_index = arg_max(&probs);
        let confidence = probs[class_index];

        Ok(Prediction {
            class_index,
            identity: self.identities[class_index].clone(),
            confidence,
            is_confident: confidence >= self.confidence_threshold,
        })
    }
}
