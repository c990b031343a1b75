// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Reloads a trained model and runs one evaluation pass:
//
//   Step 1: Load train_config.json       (Layer 6 - infra)
//   Step 2: Rebuild the validation split (Layer 4 - data)
//   Step 3: Rebuild model, load weights  (Layer 5 + 6)
//   Step 4: Evaluation pass              (Layer 5 - ml)
//
// The model runs on the plain (non-autodiff) backend, the same
// one the training loop evaluates on.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::train_use_case::{build_split, TrainConfig};
use crate::data::{dataset::SegmentationDataset, loader::build_loader};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, png::PngPanelSink};
use crate::ml::{
    aggregator::EpochMetricAggregator,
    context::ExecutionContext,
    loss::PixelCrossEntropy,
    metrics::ClassAuc,
    model::{SegNet, SegNetConfig},
    step::StepExecutor,
    trainer::{detect_accelerator, evaluation_pass},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Epoch of the checkpoint that was evaluated
    pub epoch:    usize,
    pub val_loss: f64,
    pub metrics:  Vec<f64>,
}

impl EvaluationReport {
    pub fn summary_line(&self) -> String {
        let metrics: Vec<String> = self.metrics.iter().map(|m| format!("{m:.4}")).collect();
        format!(
            "Checkpoint: {}  Val Loss: {:.4}  Metrics: {}",
            self.epoch,
            self.val_loss,
            metrics.join(" ")
        )
    }
}

pub struct EvaluateUseCase {
    ckpt_manager: CheckpointManager,
    epoch:        Option<usize>,
    cpu:          bool,
}

impl EvaluateUseCase {
    /// `epoch = None` evaluates the latest checkpoint. `cpu` forces the
    /// ndarray backend even if training used the accelerator.
    pub fn new(dir_checkpoint: impl Into<std::path::PathBuf>, epoch: Option<usize>, cpu: bool) -> Self {
        Self { ckpt_manager: CheckpointManager::new(dir_checkpoint), epoch, cpu }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        // ── Step 1: Config the model was trained with ─────────────────────────
        let mut cfg = self.ckpt_manager.load_config()?;
        cfg.cpu |= self.cpu;

        // ── Step 2: Same seed → same validation samples ───────────────────────
        let (_, val_dataset) = build_split(&cfg.data)?;
        tracing::info!("Evaluating on {} validation samples", val_dataset.sample_count());

        // Same backend rule as training: no adapter means CPU, or a
        // device error under legacy explicit placement.
        let accelerator = if cfg.cpu { None } else { detect_accelerator() };
        match accelerator {
            Some(device) => self.evaluate_on::<Wgpu>(&cfg, val_dataset, device.clone(), Some(device)),
            None         => self.evaluate_on::<NdArray>(&cfg, val_dataset, NdArrayDevice::Cpu, None),
        }
    }

    fn evaluate_on<B: Backend>(
        &self,
        cfg:         &TrainConfig,
        dataset:     SegmentationDataset,
        device:      B::Device,
        accelerator: Option<B::Device>,
    ) -> Result<EvaluationReport> {
        let context = ExecutionContext::resolve(cfg.legacy, cfg.cpu, accelerator)?;

        // ── Step 3: Rebuild the architecture, then load the weights ───────────
        let model: SegNet<B> =
            SegNetConfig::new(cfg.data.in_channels, cfg.hidden_channels, cfg.data.num_classes).init(&device);
        let (model, epoch) = self.ckpt_manager.load_model::<B, _>(model, self.epoch, &device)?;

        // ── Step 4: One evaluation pass ───────────────────────────────────────
        let loader   = build_loader::<B>(dataset, cfg.batch_size, device, None);
        let metrics  = MetricsLogger::new(&cfg.output_dir)?;
        let mut executor =
            StepExecutor::new(context, Box::new(PngPanelSink), Box::new(metrics), &cfg.output_dir);
        let mut aggregator = EpochMetricAggregator::new();

        let (val_loss, metrics) =
            evaluation_pass(&model, &loader, &PixelCrossEntropy, &ClassAuc, &mut executor, &mut aggregator)?;

        if let Some(sink) = executor.metric_sink() {
            sink.end_epoch(epoch)?;
        }
        Ok(EvaluationReport { epoch, val_loss, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let report = EvaluationReport { epoch: 5, val_loss: 0.123456, metrics: vec![0.5, 0.87654] };
        assert_eq!(report.summary_line(), "Checkpoint: 5  Val Loss: 0.1235  Metrics: 0.5000 0.8765");
    }

    #[test]
    fn test_train_then_evaluate_on_cpu() {
        use crate::application::train_use_case::TrainUseCase;
        use crate::data::synthetic::DataConfig;

        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            epochs:          1,
            batch_size:      4,
            batch_update:    4,
            cpu:             true,
            dir_checkpoint:  tmp.path().join("ckpt").display().to_string(),
            output_dir:      tmp.path().join("out").display().to_string(),
            data:            DataConfig { num_samples: 12, image_size: 8, num_classes: 3, ..DataConfig::default() },
            hidden_channels: 4,
            ..TrainConfig::default()
        };

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(report.epochs.len(), 1);
        assert_eq!(report.checkpoints, vec![tmp.path().join("ckpt").join("0.pth")]);
        assert!(tmp.path().join("out").join("metrics.csv").is_file());

        let eval = EvaluateUseCase::new(&cfg.dir_checkpoint, None, false).execute().unwrap();
        assert_eq!(eval.epoch, 0);
        assert!(eval.val_loss.is_finite());
        assert_eq!(eval.metrics.len(), 3);
    }

    #[test]
    fn test_missing_checkpoint_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let use_case = EvaluateUseCase::new(tmp.path().join("nothing"), None, true);
        assert!(use_case.execute().is_err());
    }
}
