// ============================================================
// Layer 5 — Epoch Metric Aggregator
// ============================================================
// Metrics such as ROC-AUC are not averages of per-batch
// values, so the evaluation pass keeps every output and label
// of the epoch and computes metrics once at the end:
//
//   begin_epoch()            → buffers cleared
//   record(labels, outputs)  → one entry per batch, arrival order
//   finalize(metrics_fn)     → cat along dim 0, compute once,
//                              report auc<i>, buffers cleared
//
// Buffers hold host copies (`TensorData`), so a recorded batch
// keeps neither an autodiff graph nor accelerator memory alive.
// `finalize` rebuilds them on the ndarray CPU backend.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
    tensor::TensorData,
};

use crate::domain::{
    error::TrainError,
    mode::Mode,
    traits::{Aggregation, MetricSink},
};
use crate::ml::traits::MetricsFunction;

#[derive(Default)]
pub struct EpochMetricAggregator {
    labels:  Vec<TensorData>,
    outputs: Vec<TensorData>,
}

impl EpochMetricAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_epoch(&mut self) {
        self.labels.clear();
        self.outputs.clear();
    }

    /// Copy one batch to the host, detached from any graph.
    pub fn record<B: Backend>(&mut self, labels: Tensor<B, 4, Int>, outputs: Tensor<B, 4>) {
        self.labels.push(labels.into_data());
        self.outputs.push(outputs.into_data());
    }

    /// Batches recorded since `begin_epoch`.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Compute the epoch's metrics and clear the buffers.
    ///
    /// Buffers are cleared even when the metrics function fails, so a
    /// failed epoch never leaks into the next one.
    pub fn finalize<F: MetricsFunction>(
        &mut self,
        metrics_fn: &F,
        sink:       Option<&mut dyn MetricSink>,
    ) -> Result<Vec<f64>> {
        if self.is_empty() {
            return Err(TrainError::EmptyLoader { mode: Mode::Eval }.into());
        }
        tracing::debug!("Computing metrics over {} buffered batches", self.len());
        let labels  = std::mem::take(&mut self.labels);
        let outputs = std::mem::take(&mut self.outputs);

        let device = NdArrayDevice::Cpu;
        let labels: Vec<Tensor<NdArray, 4, Int>> =
            labels.into_iter().map(|d| Tensor::from_data(d, &device)).collect();
        let outputs: Vec<Tensor<NdArray, 4>> =
            outputs.into_iter().map(|d| Tensor::from_data(d, &device)).collect();

        let metrics = metrics_fn.compute(Tensor::cat(labels, 0), Tensor::cat(outputs, 0))?;

        if let Some(sink) = sink {
            for (i, value) in metrics.iter().enumerate() {
                sink.log(&format!("auc{i}"), *value, Aggregation::EpochMean, true);
            }
        }
        Ok(metrics)
    }
}
