// ============================================================
// Layer 5 — Collaborator Traits
// ============================================================
// The loop is written against these three traits, never
// against the concrete network, loss or metric. Tests swap in
// stubs; the binary uses SegNet, PixelCrossEntropy and
// ClassAuc.
//
// Loss and metrics are generic over the backend per call:
// the same value is used on the autodiff backend during
// training and on the inner backend during evaluation.

use anyhow::Result;
use burn::prelude::*;

/// A network mapping images to per-pixel class logits.
///
/// Train/eval mode is carried by the backend type: the trainer runs
/// `AutodiffModule::valid()` for evaluation, which yields the same
/// network on the inner backend with autodiff and dropout disabled.
pub trait SegmentationModel<B: Backend>: Module<B> {
    /// images: [batch, channels, h, w] → logits: [batch, classes, h, w]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4>;

    /// Stop gradient tracking for the parameters this model declares
    /// frozen. Called once, before the optimizer is built.
    fn freeze(self) -> Self;

    /// Number of scalar parameters covered by `freeze`.
    fn num_frozen_params(&self) -> usize;
}

pub trait LossFunction {
    /// Returns `(scalar loss, auxiliary)`. The loop only reads the scalar.
    fn forward<B: Backend>(
        &self,
        output: Tensor<B, 4>,
        labels: Tensor<B, 4, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>);
}

pub trait MetricsFunction {
    /// Called once per evaluation epoch with every label and output of
    /// the epoch concatenated along the sample dimension.
    fn compute<B: Backend>(
        &self,
        labels:  Tensor<B, 4, Int>,
        outputs: Tensor<B, 4>,
    ) -> Result<Vec<f64>>;
}
