//! Supervised training of the speaker classifier.
//!
//! Takes a snapshot of the enrollment registry, assigns one class index per
//! identity in registry order, and fits the CNN with cross-entropy and AdamW.
//! Validation drives three callbacks mirrored from the usual recipe: early
//! stopping on validation loss, learning-rate decay on plateau, and
//! checkpointing of the best-validation-accuracy weights. A failed run leaves
//! nothing published – the caller decides what to do with the returned model.

use candle_core::{Device, Tensor, D};
use candle_nn::{
    loss, ops,
    optim::{AdamW, ParamsAdamW},
    Optimizer, VarBuilder, VarMap,
};
use thiserror::Error;

use super::model::{ModelWeights, SpeakerModel, TensorData};
use super::nn::SpeakerCnn;
use crate::config::FeatureKind;
use crate::enroll::TemplateStore;
use crate::features::FeatureEncoding;

#[derive(Debug, Error)]
pub enum TrainError {
    /// Class indices need at least two identities to mean anything.
    #[error("training requires at least two enrolled identities with samples (got {got})")]
    InsufficientTrainingData { got: usize },

    /// Every training encoding must share one shape to batch.
    #[error("enrolled encodings disagree on shape: {first:?} vs {other:?}")]
    ShapeDisagreement {
        first: (usize, usize),
        other: (usize, usize),
    },

    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("weight snapshot poisoned: {0}")]
    Poison(String),
}

/// Hyper-parameters accepted by [`train`].
#[derive(Clone, Debug)]
pub struct TrainOptions {
    /// Initial AdamW learning rate.
    pub lr: f64,
    /// Maximum epochs.
    pub epochs: usize,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Epochs without validation-loss improvement before stopping.
    pub early_stop_patience: usize,
    /// Epochs without improvement before the learning rate decays.
    pub plateau_patience: usize,
    /// Multiplicative decay applied on plateau.
    pub lr_decay: f64,
    /// Decay floor.
    pub min_lr: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            epochs: 30,
            batch_size: 16,
            early_stop_patience: 10,
            plateau_patience: 5,
            lr_decay: 0.5,
            min_lr: 1e-7,
        }
    }
}

/// Train a new model from the registry snapshot.
///
/// The store itself is read-only here; the returned [`SpeakerModel`] records
/// the store generation so staleness is detectable after later enrollment
/// changes.
pub fn train(
    store: &TemplateStore,
    feature_kind: FeatureKind,
    opts: &TrainOptions,
) -> Result<SpeakerModel, TrainError> {
    /* ---------- 1. Snapshot & class assignment ---------- */

    let eligible: Vec<(&str, Vec<&FeatureEncoding>)> = store
        .iter()
        .filter(|(_, t)| !t.is_empty())
        .map(|(id, t)| (id, t.encodings().collect()))
        .collect();

    if eligible.len() < 2 {
        return Err(TrainError::InsufficientTrainingData {
            got: eligible.len(),
        });
    }

    let shape = eligible[0].1[0].shape();
    for (_, encodings) in &eligible {
        for enc in encodings {
            if enc.shape() != shape {
                return Err(TrainError::ShapeDisagreement {
                    first: shape,
                    other: enc.shape(),
                });
            }
        }
    }

    let identities: Vec<String> = eligible.iter().map(|(id, _)| (*id).to_owned()).collect();

    /* ---------- 2. Deterministic train / validation split ---------- */

    // Hold out the last sample of every identity that can spare one;
    // validate on the training set when nobody can.
    let mut train_set: Vec<(&FeatureEncoding, u32)> = Vec::new();
    let mut val_set: Vec<(&FeatureEncoding, u32)> = Vec::new();
    for (class, (_, encodings)) in eligible.iter().enumerate() {
        let split = if encodings.len() >= 2 {
            encodings.len() - 1
        } else {
            encodings.len()
        };
        for &enc in &encodings[..split] {
            train_set.push((enc, class as u32));
        }
        for &enc in &encodings[split..] {
            val_set.push((enc, class as u32));
        }
    }
    // Interleave classes so every mini-batch stays balanced.
    train_set.sort_by_key(|&(_, class)| class);
    let mut interleaved: Vec<(&FeatureEncoding, u32)> = Vec::with_capacity(train_set.len());
    let mut round = 0;
    while interleaved.len() < train_set.len() {
        for class in 0..identities.len() as u32 {
            let mut seen = 0;
            for &(enc, c) in &train_set {
                if c == class {
                    if seen == round {
                        interleaved.push((enc, c));
                        break;
                    }
                    seen += 1;
                }
            }
        }
        round += 1;
    }
    let train_set = interleaved;
    let val_is_train = val_set.is_empty();
    let val_set = if val_is_train {
        train_set.clone()
    } else {
        val_set
    };

    /* ---------- 3. Tensors ---------- */

    let dev = Device::Cpu;
    let batchify = |set: &[(&FeatureEncoding, u32)]| -> candle_core::Result<(Tensor, Tensor)> {
        let mut data = Vec::with_capacity(set.len() * shape.0 * shape.1);
        let mut labels = Vec::with_capacity(set.len());
        for &(enc, class) in set {
            data.extend_from_slice(enc.as_slice());
            labels.push(class);
        }
        let xs = Tensor::from_vec(data, (set.len(), 1, shape.0, shape.1), &dev)?;
        let ys = Tensor::from_vec(labels, (set.len(),), &dev)?;
        Ok((xs, ys))
    };

    let (tr_x, tr_y) = batchify(&train_set)?;
    let (val_x, val_y) = batchify(&val_set)?;
    let val_labels: Vec<u32> = val_set.iter().map(|&(_, c)| c).collect();

    /* ---------- 4. Network & optimizer ---------- */

    let var_map = VarMap::new();
    let vb = VarBuilder::from_varmap(&var_map, candle_core::DType::F32, &dev);
    let net = SpeakerCnn::new(vb, identities.len())?;

    let mut lr = opts.lr;
    let mut opt = AdamW::new(
        var_map.all_vars(),
        ParamsAdamW {
            lr,
            ..Default::default()
        },
    )?;

    /* ---------- 5. Epoch loop ---------- */

    let batches = train_set.len().div_ceil(opts.batch_size);
    let mut best_val_loss = f32::INFINITY;
    let mut best_val_acc = f32::MIN;
    let mut best_weights: Option<ModelWeights> = None;
    let mut epochs_no_improve = 0usize;
    let mut plateau = 0usize;

    for epoch in 1..=opts.epochs {
        let mut epoch_loss = 0f32;

        for b in 0..batches {
            let lo = b * opts.batch_size;
            let len = opts.batch_size.min(train_set.len() - lo);

            let x = tr_x.narrow(0, lo, len)?;
            let y = tr_y.narrow(0, lo, len)?;

            let logits = net.forward_t(&x, true)?;
            let batch_loss = loss::cross_entropy(&logits, &y)?;
            opt.backward_step(&batch_loss)?;

            epoch_loss += batch_loss.to_scalar::<f32>()?;
        }

        /* -------- validation & callbacks -------- */

        let v_logits = net.forward_t(&val_x, false)?;
        let v_loss = loss::cross_entropy(&v_logits, &val_y)?.to_scalar::<f32>()?;
        let v_acc = accuracy(&v_logits, &val_labels)?;

        if v_acc > best_val_acc {
            best_val_acc = v_acc;
            best_weights = Some(snapshot_weights(&var_map)?);
        }

        if v_loss < best_val_loss - 1e-6 {
            best_val_loss = v_loss;
            epochs_no_improve = 0;
            plateau = 0;
        } else {
            epochs_no_improve += 1;
            plateau += 1;
        }

        log::debug!(
            target: "voxgate",
            "epoch {}/{}  train_loss={:.6}  val_loss={:.6}  val_acc={:.3}  lr={:.2e}",
            epoch,
            opts.epochs,
            epoch_loss / batches as f32,
            v_loss,
            v_acc,
            lr
        );

        if epochs_no_improve >= opts.early_stop_patience {
            break;
        }

        if plateau >= opts.plateau_patience && lr > opts.min_lr {
            lr = (lr * opts.lr_decay).max(opts.min_lr);
            plateau = 0;
            opt = AdamW::new(
                var_map.all_vars(),
                ParamsAdamW {
                    lr,
                    ..Default::default()
                },
            )?;
        }
    }

    /* ---------- 6. Pack the snapshot ---------- */

    let weights = match best_weights {
        Some(w) => w,
        None => snapshot_weights(&var_map)?,
    };

    Ok(SpeakerModel::new(
        identities,
        shape,
        feature_kind,
        store.generation(),
        weights,
    ))
}

/// Fraction of rows whose arg-max matches the label.
fn accuracy(logits: &Tensor, labels: &[u32]) -> candle_core::Result<f32> {
    let probs = ops::softmax(logits, D::Minus1)?.to_vec2::<f32>()?;
    let correct = probs
        .iter()
        .zip(labels)
        .filter(|&(ref row, &label)| arg_max(row) == label as usize)
        .count();
    Ok(correct as f32 / labels.len().max(1) as f32)
}

pub(crate) fn arg_max(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or_default()
}

/// Copy every tensor out of the var-map, name-sorted for determinism.
fn snapshot_weights(var_map: &VarMap) -> Result<ModelWeights, TrainError> {
    let guard = var_map
        .data()
        .lock()
        .map_err(|e| TrainError::Poison(e.to_string()))?;

    let mut names: Vec<&String> = guard.keys().collect();
    names.sort();

    let mut weights = ModelWeights::new();
    for name in names {
        let var = &guard[name];
        let tensor = var.as_tensor();
        weights.insert(
            name.clone(),
            TensorData {
                dims: tensor.dims().to_vec(),
                values: tensor.flatten_all()?.to_vec1::<f32>()?,
            },
        );
    }
    Ok(weights)
}
