//! Trained-model value and its persistence container.
//!
//! A [`SpeakerModel`] is an immutable snapshot: the weight tensors *plus* the
//! identity ordering the class indices were assigned from. Persisting the
//! mapping inside the same value is what keeps inference honest across
//! retrains – indices are never resolved against live enrollment order.
//!
//! The provided container is CBOR with an atomic `<file>.tmp` → rename save;
//! collaborators that own their own persistence can ignore it and serialize
//! the struct however they like.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use ciborium::{de, ser};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::config::FeatureKind;

/// Current container version. Bump whenever the stored layout changes.
pub const MODEL_VERSION: u8 = 1;

/// One weight tensor, shape plus row-major values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TensorData {
    pub dims: Vec<usize>,
    pub values: Vec<f32>,
}

/// Named weight tensors in deterministic order.
pub type ModelWeights = IndexMap<String, TensorData>;

/// Immutable trained classifier snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakerModel {
    version: u8,

    /// Class index → identity key, captured at training time.
    pub identities: Vec<String>,

    /// `(frames, bins)` every input encoding must match.
    pub input_shape: (usize, usize),

    /// Extraction mode the training encodings were produced with.
    pub feature_kind: FeatureKind,

    /// Template-store generation the snapshot was trained against; lets the
    /// facade flag the model as stale after the identity set changes.
    pub trained_generation: u64,

    pub weights: ModelWeights,
}

impl SpeakerModel {
    pub fn new(
        identities: Vec<String>,
        input_shape: (usize, usize),
        feature_kind: FeatureKind,
        trained_generation: u64,
        weights: ModelWeights,
    ) -> Self {
        Self {
            version: MODEL_VERSION,
            identities,
            input_shape,
            feature_kind,
            trained_generation,
            weights,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn num_classes(&self) -> usize {
        self.identities.len()
    }
}

impl ModelSave for SpeakerModel {}
impl ModelLoad for SpeakerModel {}

/* --------------------------------------------------------------------- */
/*  Container I/O                                                        */

#[derive(Debug, Error)]
pub enum ModelIoError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cbor: {0}")]
    Cbor(String),
}

type IoResult<T> = Result<T, ModelIoError>;

fn write_cbor<W: Write, T: Serialize + ?Sized>(w: W, val: &T) -> IoResult<()> {
    ser::into_writer(val, w).map_err(|e| ModelIoError::Cbor(e.to_string()))
}

fn read_cbor<R: Read, T: DeserializeOwned>(r: R) -> IoResult<T> {
    de::from_reader(r).map_err(|e| ModelIoError::Cbor(e.to_string()))
}

/// CBOR serialization with an atomic file write.
pub trait ModelSave: Serialize {
    /// Atomically write CBOR to `path` via `<file>.tmp` → rename on the same
    /// filesystem, so a crash mid-write never corrupts a published model.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> IoResult<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        {
            let f = File::create(&tmp)?;
            let mut bw = BufWriter::new(f);
            write_cbor(&mut bw, self)?;
            bw.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Serialize into an in-memory CBOR buffer.
    fn save_to_buffer(&self) -> IoResult<Vec<u8>> {
        let mut buf = Vec::new();
        write_cbor(&mut buf, self)?;
        Ok(buf)
    }
}

/// CBOR deserialization counterpart of [`ModelSave`].
pub trait ModelLoad: DeserializeOwned + Sized {
    fn load_from_file<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let f = File::open(path)?;
        read_cbor(BufReader::new(f))
    }

    fn load_from_buffer(buf: &[u8]) -> IoResult<Self> {
        read_cbor(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SpeakerModel {
        let mut weights = ModelWeights::new();
        weights.insert(
            "head.weight".to_owned(),
            TensorData {
                dims: vec![2, 3],
                values: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            },
        );
        SpeakerModel::new(
            vec!["ada".into(), "grace".into()],
            (100, 128),
            FeatureKind::Spectrogram,
            7,
            weights,
        )
    }

    #[test]
    fn buffer_round_trip_preserves_the_mapping() {
        let m = model();
        let buf = m.save_to_buffer().unwrap();
        let loaded = SpeakerModel::load_from_buffer(&buf).unwrap();
        assert_eq!(loaded.version(), MODEL_VERSION);
        assert_eq!(loaded.identities, m.identities);
        assert_eq!(loaded.input_shape, (100, 128));
        assert_eq!(loaded.trained_generation, 7);
        assert_eq!(loaded.weights["head.weight"].dims, vec![2, 3]);
    }

    #[test]
    fn file_round_trip_is_atomic_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speakers.vgm");
        let m = model();
        m.save_to_file(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());
        let loaded = SpeakerModel::load_from_file(&path).unwrap();
        assert_eq!(loaded.identities, m.identities);
    }
}
