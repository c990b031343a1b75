// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the config          (this layer)
//   Step 2: Generate + split samples     (Layer 4 - data)
//   Step 3: Save config                  (Layer 6 - infra)
//   Step 4: Run training loop            (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::{fs, path::Path};

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::SegmentationDataset,
    splitter::split_train_val,
    synthetic::{generate, DataConfig},
};
use crate::domain::{error::TrainError, summary::TrainingReport};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// The eight loop options are required: a JSON file missing one of
// them, or giving it the wrong type, is rejected before anything
// runs. Everything below them has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub lr:             f64,
    pub weight_decay:   f64,
    pub epochs:         usize,
    /// Samples per micro-batch
    pub batch_size:     usize,
    /// Samples per optimizer step; a multiple of `batch_size`
    pub batch_update:   usize,
    /// Explicit device placement and no structured logging
    pub legacy:         bool,
    pub cpu:            bool,
    pub dir_checkpoint: String,

    /// Diagnostic panels and metrics.csv go here
    #[serde(default = "default_output_dir")]
    pub output_dir:      String,
    #[serde(default)]
    pub data:            DataConfig,
    #[serde(default = "default_hidden_channels")]
    pub hidden_channels: usize,
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_hidden_channels() -> usize {
    16
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lr:              0.01,
            weight_decay:    1e-4,
            epochs:          10,
            batch_size:      8,
            batch_update:    8,
            legacy:          false,
            cpu:             false,
            dir_checkpoint:  "checkpoints".to_string(),
            output_dir:      default_output_dir(),
            data:            DataConfig::default(),
            hidden_channels: default_hidden_channels(),
        }
    }
}

impl TrainConfig {
    /// Parse a JSON config. A missing or ill-typed field is a
    /// configuration error, as is a file that fails `validate`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .map_err(|e| TrainError::config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(TrainError::config(format!("lr must be a positive number, got {}", self.lr)));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(TrainError::config(format!(
                "weight_decay must be >= 0, got {}",
                self.weight_decay
            )));
        }
        if self.batch_size == 0 {
            return Err(TrainError::config("batch_size must be > 0"));
        }
        if self.batch_update == 0 {
            return Err(TrainError::config("batch_update must be > 0"));
        }
        if self.batch_update % self.batch_size != 0 {
            return Err(TrainError::config(format!(
                "batch_update ({}) must be a multiple of batch_size ({})",
                self.batch_update, self.batch_size
            )));
        }
        if self.hidden_channels == 0 {
            return Err(TrainError::config("hidden_channels must be > 0"));
        }

        let data = &self.data;
        if data.num_classes < 2 {
            return Err(TrainError::config("data.num_classes must be >= 2"));
        }
        if data.in_channels == 0 || data.image_size == 0 {
            return Err(TrainError::config("data.in_channels and data.image_size must be > 0"));
        }
        if !(data.train_fraction > 0.0 && data.train_fraction < 1.0) {
            return Err(TrainError::config(format!(
                "data.train_fraction must be in (0, 1), got {}",
                data.train_fraction
            )));
        }
        Ok(())
    }

    /// Micro-batches per optimizer step.
    pub fn accumulation_window(&self) -> usize {
        (self.batch_update / self.batch_size.max(1)).max(1)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate before touching disk ─────────────────────────────
        cfg.validate()?;

        // ── Step 2: Generate + split ──────────────────────────────────────────
        // Seeded from the config, so `evaluate` can rebuild the same split
        let (train_dataset, val_dataset) = build_split(&cfg.data)?;
        tracing::info!(
            "Split: {} train, {} validation",
            train_dataset.sample_count(),
            val_dataset.sample_count()
        );

        // ── Step 3: Save config next to the checkpoints ───────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.dir_checkpoint);
        ckpt_manager.save_config(cfg)?;

        // ── Step 4: Run training loop (Layer 5) ───────────────────────────────
        let report = run_training(cfg, train_dataset, val_dataset, ckpt_manager)?;

        for failure in &report.checkpoint_failures {
            tracing::warn!("Epoch {} has no checkpoint: {}", failure.epoch, failure.error);
        }
        Ok(report)
    }
}

/// Generate the dataset described by `data` and split it with a
/// generator seeded from `data.seed`. Deterministic for a given config.
pub fn build_split(data: &DataConfig) -> Result<(SegmentationDataset, SegmentationDataset)> {
    let samples = generate(data);
    let foreground = samples.iter().map(|s| s.foreground_fraction()).sum::<f64>() / samples.len().max(1) as f64;
    tracing::info!("Generated {} samples, {:.1}% foreground pixels", samples.len(), foreground * 100.0);
    let mut rng = StdRng::seed_from_u64(data.seed);
    let (train, val) = split_train_val(samples, data.train_fraction, &mut rng);
    if train.is_empty() || val.is_empty() {
        return Err(TrainError::config(format!(
            "{} samples with train_fraction {} leave one split empty",
            data.num_samples, data.train_fraction
        ))
        .into());
    }
    Ok((SegmentationDataset::new(train), SegmentationDataset::new(val)))
}
