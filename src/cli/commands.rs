// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// `train --config run.json` reads the whole TrainConfig from a
// JSON file instead of the flags below.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::synthetic::DataConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the pixel classifier on a generated dataset
    Train(TrainArgs),

    /// Evaluate a saved checkpoint on the validation split
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON file holding a full TrainConfig; overrides every other flag
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SGD learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// L2 penalty added to every trainable parameter's gradient
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Samples per forward pass
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Samples per optimizer step; must be a multiple of --batch-size.
    /// Larger values accumulate gradients over several batches.
    #[arg(long, default_value_t = 8)]
    pub batch_update: usize,

    /// Move every batch to the accelerator explicitly and disable
    /// structured metric logging
    #[arg(long)]
    pub legacy: bool,

    /// Run on the CPU (ndarray) backend
    #[arg(long)]
    pub cpu: bool,

    /// Directory for <epoch>.pth checkpoints and train_config.json
    #[arg(long, default_value = "checkpoints")]
    pub dir_checkpoint: String,

    /// Directory for diagnostic panels and metrics.csv
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Hidden channels of the convolutional body
    #[arg(long, default_value_t = 16)]
    pub hidden_channels: usize,

    /// Number of generated samples (split 80/20)
    #[arg(long, default_value_t = 80)]
    pub num_samples: usize,

    /// Edge length of the square generated images
    #[arg(long, default_value_t = 32)]
    pub image_size: usize,

    /// Pixel classes, background included
    #[arg(long, default_value_t = 5)]
    pub num_classes: usize,

    /// Seed for data generation, the split and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl TrainArgs {
    /// Resolve the run's config: the JSON file when `--config` is
    /// given, the flags otherwise.
    pub fn into_config(self) -> Result<TrainConfig> {
        match &self.config {
            Some(path) => TrainConfig::from_json_file(path),
            None       => Ok(self.into()),
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            lr:              a.lr,
            weight_decay:    a.weight_decay,
            epochs:          a.epochs,
            batch_size:      a.batch_size,
            batch_update:    a.batch_update,
            legacy:          a.legacy,
            cpu:             a.cpu,
            dir_checkpoint:  a.dir_checkpoint,
            output_dir:      a.output_dir,
            hidden_channels: a.hidden_channels,
            data: DataConfig {
                num_samples: a.num_samples,
                image_size:  a.image_size,
                num_classes: a.num_classes,
                seed:        a.seed,
                ..DataConfig::default()
            },
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory the checkpoints were saved to during training
    #[arg(long, default_value = "checkpoints")]
    pub dir_checkpoint: String,

    /// Checkpoint epoch to load; defaults to the latest one
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Run on the CPU (ndarray) backend
    #[arg(long)]
    pub cpu: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_flags_map_onto_config() {
        let args = train_args(&[
            "image-classifier-trainer", "train",
            "--lr", "0.5", "--batch-size", "2", "--batch-update", "6",
            "--legacy", "--cpu", "--num-classes", "3",
        ]);
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.lr, 0.5);
        assert_eq!(cfg.accumulation_window(), 3);
        assert!(cfg.legacy && cfg.cpu);
        assert_eq!(cfg.data.num_classes, 3);
        assert_eq!(cfg.dir_checkpoint, "checkpoints");
    }

    #[test]
    fn test_config_file_overrides_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"lr": 0.2, "weight_decay": 0.0, "epochs": 1, "batch_size": 1,
                "batch_update": 1, "legacy": false, "cpu": true, "dir_checkpoint": "c"}"#,
        )
        .unwrap();

        let path = path.display().to_string();
        let args = train_args(&["image-classifier-trainer", "train", "--lr", "9", "--config", &path]);
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.lr, 0.2);
        assert_eq!(cfg.dir_checkpoint, "c");
    }

    #[test]
    fn test_evaluate_defaults_to_latest() {
        let cli = Cli::try_parse_from(["image-classifier-trainer", "evaluate", "--cpu"]).unwrap();
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.epoch, None);
                assert!(args.cpu);
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
