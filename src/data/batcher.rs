// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec of
// SegmentationSamples into device tensors.
//
//   Input:  N samples, each [C, S, S] image + [S, S] mask
//   Output: images [N, C, S, S] (float)
//           labels [N, 1, S, S] (int class indices)
//           ids    Vec<usize>   (carried along, unused by the loop)
//
// All samples in a batch share channels and size (the
// synthetic generator guarantees it), so we can flatten
// everything into one Vec and reshape once.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SegmentationSample;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// One batch as the training loop sees it.
/// `images` and `labels` always share the leading (sample) dimension.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Shape: [batch, 1, height, width], values in 0..num_classes
    pub labels: Tensor<B, 4, Int>,

    /// Sample identifiers, in batch order
    pub ids: Vec<usize>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move both tensors to `device`. Blocks until the transfer completes.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            images: self.images.to_device(device),
            labels: self.labels.to_device(device),
            ids:    self.ids,
        }
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SegmentationSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<SegmentationSample>) -> ImageBatch<B> {
        let n        = items.len();
        let channels = items.first().map_or(1, |s| s.channels);
        let size     = items.first().map_or(0, |s| s.size);

        let pixels: Vec<f32> = items.iter().flat_map(|s| s.image.iter().copied()).collect();
        let classes: Vec<i64> = items.iter().flat_map(|s| s.mask.iter().copied()).collect();
        let ids: Vec<usize> = items.iter().map(|s| s.id).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [n, channels, size, size]),
            &self.device,
        );
        let labels = Tensor::<B, 4, Int>::from_data(
            TensorData::new(classes, [n, 1, size, size]),
            &self.device,
        );

        ImageBatch { images, labels, ids }
    }
}
