// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "a dataset exists" and "the loop holds
// a batch of tensors":
//
//   synthetic::generate   → Vec<SegmentationSample>
//       │
//       ▼
//   split_train_val       → train / validation samples
//       │
//       ▼
//   SegmentationDataset   → Burn Dataset trait
//       │
//       ▼
//   ImageBatcher          → stacks samples into ImageBatch
//       │
//       ▼
//   BurnLoader            → BatchLoader the trainer iterates
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Generated images with per-pixel class masks
pub mod synthetic;

/// Implements Burn's Dataset trait for segmentation samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// BatchLoader implementations (Burn DataLoader, Vec)
pub mod loader;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
