use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One image with its per-pixel class mask.
/// Image layout is channel-major: `[channels, size, size]` flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationSample {
    pub id:       usize,
    pub channels: usize,
    pub size:     usize,
    pub image:    Vec<f32>,
    pub mask:     Vec<i64>,
}

impl SegmentationSample {
    pub fn pixel_count(&self) -> usize {
        self.size * self.size
    }

    /// Fraction of pixels that are not background (class 0).
    pub fn foreground_fraction(&self) -> f64 {
        let fg = self.mask.iter().filter(|&&c| c != 0).count();
        fg as f64 / self.pixel_count().max(1) as f64
    }
}

pub struct SegmentationDataset {
    samples: Vec<SegmentationSample>,
}

impl SegmentationDataset {
    pub fn new(samples: Vec<SegmentationSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<SegmentationSample> for SegmentationDataset {
    fn get(&self, index: usize) -> Option<SegmentationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
