// ============================================================
// Layer 5 — Step Executor
// ============================================================
// One forward + loss computation for one batch:
//
//   place batch (ExecutionContext)
//       │
//       ▼
//   output = model.forward(images)
//       │
//       ▼
//   (loss, _) = loss_fn(output, labels)
//       │
//       ├── report loss as train_loss / val_loss (epoch mean)
//       └── batch 5: save diagnostic panel
//
// No parameter is touched here. The training pass calls
// backward/step itself; the evaluation pass runs on the
// inner backend where no gradients exist.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::batcher::ImageBatch;
use crate::domain::{
    mode::Mode,
    traits::{Aggregation, MetricSink, VisualizationSink},
};
use crate::ml::{
    context::ExecutionContext,
    traits::{LossFunction, SegmentationModel},
    visualize::render_panel,
};

/// Batch index (0-based, per pass) at which the diagnostic panel is saved.
pub const DIAGNOSTIC_BATCH: usize = 5;

pub const TRAIN_PANEL: &str = "sample_visualization.png";
pub const EVAL_PANEL_DIR: &str = "images";

pub struct StepOutput<B: Backend> {
    /// Scalar loss; still attached to the graph on an autodiff backend
    pub loss:       Tensor<B, 1>,
    pub loss_value: f64,
    pub output:     Tensor<B, 4>,
    pub labels:     Tensor<B, 4, Int>,
}

pub struct StepExecutor<D> {
    context:     ExecutionContext<D>,
    visuals:     Box<dyn VisualizationSink>,
    metrics:     Box<dyn MetricSink>,
    output_dir:  PathBuf,
    /// Index of the next evaluation panel (`images/<n>.png`)
    eval_panels: usize,
}

impl<D: Clone> StepExecutor<D> {
    pub fn new(
        context:    ExecutionContext<D>,
        visuals:    Box<dyn VisualizationSink>,
        metrics:    Box<dyn MetricSink>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { context, visuals, metrics, output_dir: output_dir.into(), eval_panels: 0 }
    }

    /// The logging facility, or `None` when structured logging is off.
    pub fn metric_sink(&mut self) -> Option<&mut dyn MetricSink> {
        if self.context.structured_logging() {
            Some(self.metrics.as_mut())
        } else {
            None
        }
    }

    pub fn eval_panels_written(&self) -> usize {
        self.eval_panels
    }

    pub fn run_step<B, M, L>(
        &mut self,
        model:       &M,
        loss_fn:     &L,
        batch:       ImageBatch<B>,
        batch_index: usize,
        mode:        Mode,
    ) -> Result<StepOutput<B>>
    where
        B: Backend<Device = D>,
        M: SegmentationModel<B>,
        L: LossFunction,
    {
        let ImageBatch { images, labels, .. } = self.context.place(batch);

        let output = model.forward(images.clone());
        let (loss, _) = loss_fn.forward(output.clone(), labels.clone());
        let loss_value: f64 = loss.clone().into_scalar().elem();

        if let Some(sink) = self.metric_sink() {
            sink.log(mode.loss_name(), loss_value, Aggregation::EpochMean, true);
        }

        if batch_index == DIAGNOSTIC_BATCH {
            self.save_panel(images, output.clone(), labels.clone(), mode)?;
        }

        Ok(StepOutput { loss, loss_value, output, labels })
    }

    fn save_panel<B: Backend>(
        &mut self,
        images: Tensor<B, 4>,
        output: Tensor<B, 4>,
        labels: Tensor<B, 4, Int>,
        mode:   Mode,
    ) -> Result<()> {
        let panel = render_panel(images, output, labels)?;
        let path = match mode {
            Mode::Train => self.output_dir.join(TRAIN_PANEL),
            Mode::Eval => {
                let path = eval_panel_path(&self.output_dir, self.eval_panels);
                self.eval_panels += 1;
                path
            }
        };
        self.visuals
            .save(&panel, &path)
            .with_context(|| format!("saving diagnostic panel to '{}'", path.display()))?;
        tracing::debug!("Saved {} panel to '{}'", mode, path.display());
        Ok(())
    }
}

pub fn eval_panel_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(EVAL_PANEL_DIR).join(format!("{index}.png"))
}
