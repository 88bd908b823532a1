//! Spectral feature extraction: normalized samples → fixed-shape encodings.

mod cepstral;
mod encoding;
mod extractor;
mod mel;

pub use cepstral::CepstralExtractor;
pub use encoding::FeatureEncoding;
pub use extractor::{Extraction, FeatureExtractor};
pub use mel::MelSpectrogram;
