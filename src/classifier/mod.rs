//! Secondary identification signal: CNN training and inference.
//!
//! The similarity engine stays the system of record for verification
//! decisions; a trained classifier is a faster advisory signal published as
//! an immutable, versioned value.

mod infer;
mod model;
mod nn;
mod train;

pub use infer::{ClassifierError, Prediction, SpeakerClassifier};
pub use model::{
    ModelIoError, ModelLoad, ModelSave, ModelWeights, SpeakerModel, TensorData, MODEL_VERSION,
};
pub use train::{train, TrainError, TrainOptions};
