// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with gradient accumulation, evaluation on the
// autodiff-free model, per-epoch progress line and periodic
// checkpoints:
//
//   for epoch in 0..epochs
//     ├── train pass   (B = Autodiff<_>, backward + SGD step per window)
//     ├── eval pass    (model.valid() on B::InnerBackend, no graph)
//     ├── println!  progress line
//     ├── metric sink end_epoch     (structured logging only)
//     └── checkpoint when epoch % 5 == 0
//
// Key Burn insight:
//   - model.valid() returns the model on the inner backend, so
//     the evaluation loader must also batch onto that backend
//   - GradientsAccumulator sums GradientsParams across
//     micro-batches; grads() drains it, leaving it empty for
//     the next window
//
// Reference: Burn Book §5 (Training)

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatch, dataset::SegmentationDataset, loader::build_loader};
use crate::domain::{
    error::TrainError,
    mode::Mode,
    schedule::{epoch_loss_divisor, UpdateSchedule},
    summary::{CheckpointFailure, EpochSummary, TrainingReport},
    traits::BatchLoader,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, png::PngPanelSink};
use crate::ml::{
    aggregator::EpochMetricAggregator,
    context::ExecutionContext,
    loss::PixelCrossEntropy,
    metrics::ClassAuc,
    model::{SegNet, SegNetConfig},
    optimizer::build_optimizer,
    step::StepExecutor,
    traits::{LossFunction, MetricsFunction, SegmentationModel},
};

/// A checkpoint is written every this many epochs, starting at epoch 0.
pub const CHECKPOINT_EVERY: usize = 5;

/// One evaluation pass: mean loss over the batches plus the metrics
/// computed once over every output of the pass.
///
/// Shared by the training loop and the `evaluate` command.
pub fn evaluation_pass<B, M, L, F>(
    model:      &M,
    loader:     &dyn BatchLoader<ImageBatch<B>>,
    loss_fn:    &L,
    metrics_fn: &F,
    executor:   &mut StepExecutor<B::Device>,
    aggregator: &mut EpochMetricAggregator,
) -> Result<(f64, Vec<f64>)>
where
    B: Backend,
    M: SegmentationModel<B>,
    L: LossFunction,
    F: MetricsFunction,
{
    if loader.num_batches() == 0 {
        return Err(TrainError::EmptyLoader { mode: Mode::Eval }.into());
    }
    aggregator.begin_epoch();

    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    for (i, batch) in loader.batches().enumerate() {
        let step = executor.run_step(model, loss_fn, batch, i, Mode::Eval)?;
        loss_sum += step.loss_value;
        batches  += 1;
        aggregator.record(step.labels, step.output);
    }

    let metrics = aggregator.finalize(metrics_fn, executor.metric_sink())?;
    Ok((loss_sum / batches.max(1) as f64, metrics))
}

/// Loop state for one run. The model itself is moved through
/// `train_pass` / `fit` because the optimizer step consumes it.
pub struct Trainer<B, M, O, L, F>
where
    B: AutodiffBackend,
{
    optim:           O,
    loss_fn:         L,
    metrics_fn:      F,
    executor:        StepExecutor<B::Device>,
    aggregator:      EpochMetricAggregator,
    checkpoints:     CheckpointManager,
    lr:              f64,
    window:          usize,
    epochs:          usize,
    updates_applied: usize,
    _marker:         PhantomData<(B, M)>,
}

impl<B, M, O, L, F> Trainer<B, M, O, L, F>
where
    B: AutodiffBackend,
    M: SegmentationModel<B> + AutodiffModule<B>,
    M::InnerModule: SegmentationModel<B::InnerBackend>,
    O: Optimizer<M, B>,
    L: LossFunction,
    F: MetricsFunction,
{
    pub fn new(
        cfg:         &TrainConfig,
        optim:       O,
        loss_fn:     L,
        metrics_fn:  F,
        executor:    StepExecutor<B::Device>,
        checkpoints: CheckpointManager,
    ) -> Self {
        Self {
            optim,
            loss_fn,
            metrics_fn,
            executor,
            aggregator: EpochMetricAggregator::new(),
            checkpoints,
            lr:              cfg.lr,
            window:          cfg.accumulation_window(),
            epochs:          cfg.epochs,
            updates_applied: 0,
            _marker:         PhantomData,
        }
    }

    /// Optimizer steps taken so far, across all epochs.
    pub fn updates_applied(&self) -> usize {
        self.updates_applied
    }

    pub fn executor(&self) -> &StepExecutor<B::Device> {
        &self.executor
    }

    /// One training pass. Returns the updated model and the epoch's
    /// training loss (see `epoch_loss_divisor`).
    pub fn train_pass(
        &mut self,
        mut model: M,
        loader:    &dyn BatchLoader<ImageBatch<B>>,
    ) -> Result<(M, f64)> {
        let schedule = UpdateSchedule::new(self.window, loader.num_batches())?;
        tracing::debug!(
            "{} batches, {} optimizer steps this pass",
            loader.num_batches(),
            schedule.updates_per_pass(),
        );
        let mut accumulator = GradientsAccumulator::<M>::new();

        let mut loss_sum    = 0.0f64;
        let mut final_index = 0usize;
        for (i, batch) in loader.batches().enumerate() {
            let step = self.executor.run_step(&model, &self.loss_fn, batch, i, Mode::Train)?;
            loss_sum   += step.loss_value;
            final_index = i;

            let grads = GradientsParams::from_grads(step.loss.backward(), &model);
            accumulator.accumulate(&model, grads);

            if schedule.should_update(i) {
                model = self.optim.step(self.lr, model, accumulator.grads());
                self.updates_applied += 1;
            }
        }

        Ok((model, loss_sum / epoch_loss_divisor(final_index)))
    }

    pub fn eval_pass(
        &mut self,
        model:  &M::InnerModule,
        loader: &dyn BatchLoader<ImageBatch<B::InnerBackend>>,
    ) -> Result<(f64, Vec<f64>)> {
        evaluation_pass(
            model,
            loader,
            &self.loss_fn,
            &self.metrics_fn,
            &mut self.executor,
            &mut self.aggregator,
        )
    }

    /// Run every epoch. Pass failures abort the run; checkpoint
    /// failures are logged, recorded in the report and skipped.
    pub fn fit(
        &mut self,
        mut model:    M,
        train_loader: &dyn BatchLoader<ImageBatch<B>>,
        val_loader:   &dyn BatchLoader<ImageBatch<B::InnerBackend>>,
    ) -> Result<(M, TrainingReport)> {
        let mut report = TrainingReport::default();

        for epoch in 0..self.epochs {
            let start = Instant::now();

            let (trained, train_loss) = self.train_pass(model, train_loader)?;
            model = trained;
            let (val_loss, metrics) = self.eval_pass(&model.valid(), val_loader)?;

            let summary = EpochSummary { epoch, elapsed: start.elapsed(), train_loss, val_loss, metrics };
            println!("{}", summary.progress_line());

            if let Some(sink) = self.executor.metric_sink() {
                if let Err(e) = sink.end_epoch(epoch) {
                    tracing::warn!("Could not flush metrics for epoch {}: {:#}", epoch, e);
                }
            }

            if epoch % CHECKPOINT_EVERY == 0 {
                match self.checkpoints.save_model::<B, M>(&model, epoch) {
                    Ok(path) => {
                        tracing::info!("Checkpoint saved to '{}'", path.display());
                        report.checkpoints.push(path);
                    }
                    Err(e) => {
                        tracing::error!("Checkpoint for epoch {} not written: {}", epoch, e);
                        report.checkpoint_failures.push(CheckpointFailure { epoch, error: e.to_string() });
                    }
                }
            }

            report.epochs.push(summary);
        }

        tracing::info!(
            "Training complete after {} optimizer steps, {} evaluation panels",
            self.updates_applied(),
            self.executor().eval_panels_written(),
        );
        Ok((model, report))
    }
}

// ─── Backend selection ────────────────────────────────────────────────────────
pub type CpuBackend = Autodiff<NdArray>;
pub type GpuBackend = Autodiff<Wgpu>;

/// The default WGPU device, if an adapter can be brought up on it.
///
/// cubecl panics when no adapter exists, so the first allocation runs
/// under `catch_unwind` and a panic reads as "no accelerator".
pub fn detect_accelerator() -> Option<WgpuDevice> {
    let device = WgpuDevice::default();
    let probe  = device.clone();
    let alloc  = panic::catch_unwind(AssertUnwindSafe(move || {
        Tensor::<Wgpu, 1>::zeros([1], &probe).into_data()
    }));
    match alloc {
        Ok(_) => Some(device),
        Err(_) => {
            tracing::warn!("No WGPU adapter available for {:?}", device);
            None
        }
    }
}

/// Train with the backend the config asks for: ndarray on the CPU,
/// otherwise WGPU (which is also the accelerator for explicit placement).
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: SegmentationDataset,
    val_dataset:   SegmentationDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<TrainingReport> {
    let accelerator = if cfg.cpu { None } else { detect_accelerator() };
    train_on(cfg, train_dataset, val_dataset, ckpt_manager, accelerator)
}

/// Without an accelerator, managed placement falls back to the CPU and
/// legacy explicit placement fails with `TrainError::Device`.
fn train_on(
    cfg:           &TrainConfig,
    train_dataset: SegmentationDataset,
    val_dataset:   SegmentationDataset,
    ckpt_manager:  CheckpointManager,
    accelerator:   Option<WgpuDevice>,
) -> Result<TrainingReport> {
    match accelerator {
        Some(device) if !cfg.cpu => {
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<GpuBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device.clone(), Some(device))
        }
        _ => {
            if !cfg.cpu && !cfg.legacy {
                tracing::warn!("Falling back to the CPU backend");
            }
            let device = NdArrayDevice::Cpu;
            tracing::info!("Using CPU device: {:?}", device);
            train_loop::<CpuBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device, None)
        }
    }
}

fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: SegmentationDataset,
    val_dataset:   SegmentationDataset,
    ckpt_manager:  CheckpointManager,
    device:        B::Device,
    accelerator:   Option<B::Device>,
) -> Result<TrainingReport> {
    let context = ExecutionContext::resolve(cfg.legacy, cfg.cpu, accelerator)?;
    tracing::info!(
        "Placement: {:?}, structured logging: {}",
        context.placement(),
        context.structured_logging(),
    );

    // ── Build model + optimiser ───────────────────────────────────────────────
    let model_cfg = SegNetConfig::new(cfg.data.in_channels, cfg.hidden_channels, cfg.data.num_classes);
    let model: SegNet<B> = model_cfg.init(&device);
    let (model, optim) = build_optimizer::<B, _>(model, cfg.weight_decay)?;
    tracing::info!(
        "Model ready: {} -> {} -> {} channels",
        cfg.data.in_channels, cfg.hidden_channels, cfg.data.num_classes,
    );

    // ── Loaders: training on the autodiff backend, evaluation on the inner one
    let train_loader = build_loader::<B>(train_dataset, cfg.batch_size, device.clone(), Some(cfg.data.seed));
    let val_loader   = build_loader::<B::InnerBackend>(val_dataset, cfg.batch_size, device, None);

    let metrics  = MetricsLogger::new(&cfg.output_dir)?;
    let executor = StepExecutor::new(context, Box::new(PngPanelSink), Box::new(metrics), &cfg.output_dir);

    let mut trainer =
        Trainer::<B, SegNet<B>, _, _, _>::new(cfg, optim, PixelCrossEntropy, ClassAuc, executor, ckpt_manager);
    let (_model, report) = trainer.fit(model, &train_loader, &val_loader)?;
    Ok(report)
}
