// ============================================================
// Layer 4 — Synthetic Segmentation Data
// ============================================================
// In production you would load a labelled image dataset from
// disk. Here every sample is generated: a noisy background
// (class 0) with a few rectangles and discs painted on top,
// each shape carrying a random foreground class. Pixel
// intensity grows with the class index so the task is
// learnable by a small convolutional network.
//
// Generation is driven by a seeded StdRng so the `evaluate`
// command can rebuild exactly the validation split that
// training used.
//
// Reference: rand crate documentation (Rng, SeedableRng)

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::dataset::SegmentationSample;

const MAX_SHAPES: usize = 3;
const NOISE:      f32   = 0.08;

/// Knobs for the generated dataset. Every field has a default, so a
/// JSON config may omit the whole section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Total samples before the train/validation split
    pub num_samples:    usize,
    pub train_fraction: f64,
    /// Square image edge in pixels
    pub image_size:     usize,
    pub in_channels:    usize,
    /// Including background
    pub num_classes:    usize,
    pub seed:           u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            num_samples:    80,
            train_fraction: 0.8,
            image_size:     32,
            in_channels:    1,
            num_classes:    5,
            seed:           42,
        }
    }
}

#[derive(Clone, Copy)]
enum Shape {
    Rect { top: usize, left: usize, h: usize, w: usize },
    Disc { cy: f32, cx: f32, r: f32 },
}

impl Shape {
    fn random(rng: &mut StdRng, size: usize) -> Self {
        let min = (size / 6).max(1);
        let max = (size / 2).max(min + 1);
        if rng.gen_bool(0.5) {
            let h = rng.gen_range(min..max);
            let w = rng.gen_range(min..max);
            Shape::Rect {
                top:  rng.gen_range(0..=size - h),
                left: rng.gen_range(0..=size - w),
                h,
                w,
            }
        } else {
            let r = rng.gen_range(min..max) as f32 / 2.0;
            Shape::Disc {
                cy: rng.gen_range(0.0..size as f32),
                cx: rng.gen_range(0.0..size as f32),
                r,
            }
        }
    }

    fn contains(&self, y: usize, x: usize) -> bool {
        match *self {
            Shape::Rect { top, left, h, w } => {
                y >= top && y < top + h && x >= left && x < left + w
            }
            Shape::Disc { cy, cx, r } => {
                let dy = y as f32 + 0.5 - cy;
                let dx = x as f32 + 0.5 - cx;
                dy * dy + dx * dx <= r * r
            }
        }
    }
}

/// Generate `cfg.num_samples` samples deterministically from `cfg.seed`.
pub fn generate(cfg: &DataConfig) -> Vec<SegmentationSample> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    (0..cfg.num_samples)
        .map(|id| generate_one(&mut rng, id, cfg))
        .collect()
}

fn generate_one(rng: &mut StdRng, id: usize, cfg: &DataConfig) -> SegmentationSample {
    let size     = cfg.image_size;
    let channels = cfg.in_channels.max(1);
    let classes  = cfg.num_classes.max(2);

    // ── Paint the mask: later shapes overwrite earlier ones ───────────────────
    let mut mask = vec![0i64; size * size];
    let shapes = rng.gen_range(1..=MAX_SHAPES);
    for _ in 0..shapes {
        let shape = Shape::random(rng, size);
        let class = rng.gen_range(1..classes) as i64;
        for y in 0..size {
            for x in 0..size {
                if shape.contains(y, x) {
                    mask[y * size + x] = class;
                }
            }
        }
    }

    // ── Render intensities from the mask, one plane per channel ───────────────
    let mut image = Vec::with_capacity(channels * size * size);
    for ch in 0..channels {
        // later channels are slightly dimmer so they are not exact copies
        let gain = 1.0 - 0.1 * ch as f32;
        for &class in &mask {
            let base  = (class as f32 + 0.5) / classes as f32;
            let noise = rng.gen_range(-NOISE..NOISE);
            image.push((base * gain + noise).clamp(0.0, 1.0));
        }
    }

    SegmentationSample { id, channels, size, image, mask }
}
