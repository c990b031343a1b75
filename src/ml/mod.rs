// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor work lives here. The layers above hand in
// datasets and config and get back a TrainingReport.
//
// What's in this layer:
//
//   traits.rs     — SegmentationModel / LossFunction /
//                   MetricsFunction, the seams the loop is
//                   written against
//
//   model.rs      — SegNet, a small fully convolutional
//                   pixel classifier with a frozen stem
//
//   loss.rs       — pixel-wise cross-entropy
//   metrics.rs    — per-class ROC-AUC
//
//   context.rs    — device placement + structured logging,
//                   resolved once from `legacy` / `cpu`
//   step.rs       — one forward + loss per batch, loss
//                   reporting, diagnostic panels
//   visualize.rs  — renders the three-row panel
//   aggregator.rs — buffers evaluation outputs for
//                   end-of-epoch metrics
//   optimizer.rs  — freeze policy + SGD with momentum
//   trainer.rs    — epoch loop, accumulation, checkpoints
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

pub mod traits;

/// Fully convolutional pixel classifier
pub mod model;

pub mod loss;
pub mod metrics;

pub mod context;
pub mod step;
pub mod visualize;
pub mod aggregator;
pub mod optimizer;

/// Epoch loop with gradient accumulation and checkpointing
pub mod trainer;

#[cfg(test)]
pub mod test_support;
