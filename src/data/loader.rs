// ============================================================
// Layer 4 — Batch Loaders
// ============================================================
// The training loop only needs two things from a loader:
// how many batches a pass has, and a fresh iterator over
// them. Two implementations:
//
//   BurnLoader — wraps Burn's DataLoader (multi-threaded
//                prefetch, optional shuffling)
//   Vec<T>     — in-memory batches, used by tests and by
//                anything that already holds its batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::SegmentationDataset,
};
use crate::domain::traits::BatchLoader;

pub struct BurnLoader<O> {
    inner:      Arc<dyn DataLoader<O>>,
    batch_size: usize,
}

impl<O> BatchLoader<O> for BurnLoader<O> {
    fn num_batches(&self) -> usize {
        // the final batch may be partial
        self.inner.num_items().div_ceil(self.batch_size.max(1))
    }

    fn batches(&self) -> Box<dyn Iterator<Item = O> + '_> {
        Box::new(self.inner.iter())
    }
}

/// Build a loader over `dataset`. Pass `shuffle = Some(seed)` for the
/// training split; evaluation keeps dataset order.
pub fn build_loader<B: Backend>(
    dataset:    SegmentationDataset,
    batch_size: usize,
    device:     B::Device,
    shuffle:    Option<u64>,
) -> BurnLoader<ImageBatch<B>> {
    let batcher = ImageBatcher::<B>::new(device);
    let builder = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(1);
    let builder = match shuffle {
        Some(seed) => builder.shuffle(seed),
        None       => builder,
    };
    BurnLoader { inner: builder.build(dataset), batch_size }
}

impl<T: Clone> BatchLoader<T> for Vec<T> {
    fn num_batches(&self) -> usize {
        self.len()
    }

    fn batches(&self) -> Box<dyn Iterator<Item = T> + '_> {
        Box::new(self.as_slice().iter().cloned())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{generate, DataConfig};
    use burn::backend::NdArray;

    fn dataset(n: usize) -> SegmentationDataset {
        let cfg = DataConfig { num_samples: n, image_size: 4, ..Default::default() };
        SegmentationDataset::new(generate(&cfg))
    }

    #[test]
    fn test_partial_final_batch_is_counted() {
        let loader = build_loader::<NdArray>(dataset(10), 4, Default::default(), None);
        assert_eq!(loader.num_batches(), 3);

        let sizes: Vec<usize> = loader.batches().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_loader_is_restartable() {
        let loader = build_loader::<NdArray>(dataset(6), 3, Default::default(), None);
        let first: Vec<Vec<usize>> = loader.batches().map(|b| b.ids).collect();
        let second: Vec<Vec<usize>> = loader.batches().map(|b| b.ids).collect();
        assert_eq!(first, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_dataset_has_no_batches() {
        let loader = build_loader::<NdArray>(dataset(0), 4, Default::default(), Some(1));
        assert_eq!(loader.num_batches(), 0);
        assert_eq!(loader.batches().count(), 0);
    }

    #[test]
    fn test_vec_loader() {
        let batches = vec![1, 2, 3];
        let loader: &dyn BatchLoader<i32> = &batches;
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(loader.batches().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
