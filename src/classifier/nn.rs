//! Convolutional speaker classifier.
//!
//! Treats a `FeatureEncoding` as a single-channel image: four conv+batch-norm
//! blocks with widths 32→64→128→256 (the first three max-pooled, the last
//! globally average-pooled), then two dense blocks (512, 256) with batch-norm
//! and dropout, and a softmax head over the identity count. Convolutions use
//! same-padding so both the 128-band and the 13-coefficient geometry survive
//! the pooling stages.

use candle_core::{Result as CandleResult, Tensor, D};
use candle_nn::{
    batch_norm, conv2d, linear, BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Dropout, Linear,
    Module, ModuleT, VarBuilder,
};

/// Channel widths of the four convolutional blocks.
pub(crate) const CONV_WIDTHS: [usize; 4] = [32, 64, 128, 256];

struct ConvBlock {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBlock {
    fn new(vb: VarBuilder, in_c: usize, out_c: usize) -> CandleResult<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        Ok(Self {
            conv: conv2d(in_c, out_c, 3, cfg, vb.pp("conv"))?,
            bn: batch_norm(out_c, BatchNormConfig::default(), vb.pp("bn"))?,
        })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> CandleResult<Tensor> {
        let xs = self.conv.forward(xs)?.relu()?;
        self.bn.forward_t(&xs, train)
    }
}

/// The network. Weights live in the `VarMap` the [`VarBuilder`] was made
/// from; the struct itself is immutable once built.
pub struct SpeakerCnn {
    blocks: Vec<ConvBlock>,
    fc1: Linear,
    bn_fc1: BatchNorm,
    fc2: Linear,
    bn_fc2: BatchNorm,
    head: Linear,
    drop_conv: Dropout,
    drop_gap: Dropout,
    drop_fc1: Dropout,
    drop_fc2: Dropout,
}

impl SpeakerCnn {
    pub fn new(vb: VarBuilder, classes: usize) -> CandleResult<Self> {
        let mut blocks = Vec::with_capacity(CONV_WIDTHS.len());
        let mut in_c = 1;
        for (i, &out_c) in CONV_WIDTHS.iter().enumerate() {
            blocks.push(ConvBlock::new(vb.pp(format!("block{}", i + 1)), in_c, out_c)?);
            in_c = out_c;
        }

        Ok(Self {
            blocks,
            fc1: linear(CONV_WIDTHS[3], 512, vb.pp("fc1"))?,
            bn_fc1: batch_norm(512, BatchNormConfig::default(), vb.pp("bn_fc1"))?,
            fc2: linear(512, 256, vb.pp("fc2"))?,
            bn_fc2: batch_norm(256, BatchNormConfig::default(), vb.pp("bn_fc2"))?,
            head: linear(256, classes, vb.pp("head"))?,
            drop_conv: Dropout::new(0.25),
            drop_gap: Dropout::new(0.5),
            drop_fc1: Dropout::new(0.5),
            drop_fc2: Dropout::new(0.3),
        })
    }

    /// Logits for a `(batch, 1, frames, bins)` input.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> CandleResult<Tensor> {
        let mut xs = xs.clone();
        for (i, block) in self.blocks.iter().enumerate() {
            xs = block.forward_t(&xs, train)?;
            if i < self.blocks.len() - 1 {
                xs = xs.max_pool2d(2)?;
                xs = self.drop_conv.forward_t(&xs, train)?;
            }
        }

        // Global average pool over both spatial dims → (batch, channels).
        let xs = xs.mean(D::Minus1)?.mean(D::Minus1)?;
        let xs = self.drop_gap.forward_t(&xs, train)?;

        let xs = self.fc1.forward(&xs)?.relu()?;
        let xs = self.bn_fc1.forward_t(&xs, train)?;
        let xs = self.drop_fc1.forward_t(&xs, train)?;

        let xs = self.fc2.forward(&xs)?.relu()?;
        let xs = self.bn_fc2.forward_t(&xs, train)?;
        let xs = self.drop_fc2.forward_t(&xs, train)?;

        self.head.forward(&xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    fn build(classes: usize) -> SpeakerCnn {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        SpeakerCnn::new(vb, classes).unwrap()
    }

    #[test]
    fn forward_produces_one_logit_per_class() {
        let net = build(3);
        let xs = Tensor::zeros((2, 1, 16, 16), DType::F32, &Device::Cpu).unwrap();
        let logits = net.forward_t(&xs, false).unwrap();
        assert_eq!(logits.dims(), &[2, 3]);
    }

    #[test]
    fn cepstral_geometry_survives_the_pool_stack() {
        let net = build(2);
        let xs = Tensor::zeros((1, 1, 100, 13), DType::F32, &Device::Cpu).unwrap();
        let logits = net.forward_t(&xs, false).unwrap();
        assert_eq!(logits.dims(), &[1, 2]);
    }
}
