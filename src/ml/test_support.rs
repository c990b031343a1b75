//! Stub collaborators shared by the ml tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    module::Param,
    prelude::*,
};

use crate::data::batcher::ImageBatch;
use crate::domain::{
    panel::Panel,
    traits::{Aggregation, MetricSink, VisualizationSink},
};
use crate::ml::traits::{LossFunction, MetricsFunction, SegmentationModel};

pub type TestInner   = NdArray;
pub type TestBackend = Autodiff<NdArray>;
pub type TestDevice  = NdArrayDevice;

pub fn device() -> TestDevice {
    NdArrayDevice::Cpu
}

/// `n` samples of 1×2×2 ones, every label pixel set to `label`.
pub fn batch<B: Backend<Device = TestDevice>>(n: usize, label: i64) -> ImageBatch<B> {
    let device = device();
    ImageBatch {
        images: Tensor::ones([n, 1, 2, 2], &device),
        labels: Tensor::<B, 4, Int>::ones([n, 1, 2, 2], &device).mul_scalar(label),
        ids:    (0..n).collect(),
    }
}

// ─── ScaleModel ───────────────────────────────────────────────────────────────
/// Two scalar parameters; class k's logit is `image * p_k`.
/// `p1` is the declared frozen subset.
#[derive(Module, Debug)]
pub struct ScaleModel<B: Backend> {
    pub p1: Param<Tensor<B, 1>>,
    pub p2: Param<Tensor<B, 1>>,
}

impl<B: Backend> ScaleModel<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            p1: Param::from_tensor(Tensor::from_floats([0.5], device)),
            p2: Param::from_tensor(Tensor::from_floats([-0.5], device)),
        }
    }

    pub fn values(&self) -> (f32, f32) {
        (
            self.p1.val().into_scalar().elem(),
            self.p2.val().into_scalar().elem(),
        )
    }
}

impl<B: Backend> SegmentationModel<B> for ScaleModel<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, _, h, w] = images.dims();
        let device = images.device();
        let first = images.slice([0..n, 0..1, 0..h, 0..w]).expand([n, 2, h, w]);
        // p_k reaches channel k through a one-hot mask
        let onto = |p: &Param<Tensor<B, 1>>, mask: [f32; 2]| {
            p.val().reshape([1, 1, 1, 1]).expand([1, 2, 1, 1])
                * Tensor::<B, 1>::from_floats(mask, &device).reshape([1, 2, 1, 1])
        };
        let scale = onto(&self.p1, [1.0, 0.0]) + onto(&self.p2, [0.0, 1.0]);
        first * scale.expand([n, 2, h, w])
    }

    fn freeze(self) -> Self {
        Self { p1: self.p1.no_grad(), ..self }
    }

    fn num_frozen_params(&self) -> usize {
        1
    }
}

// ─── LabelMeanLoss ────────────────────────────────────────────────────────────
/// Loss equal to the mean label value, so each batch's loss is chosen by
/// the test. Stays connected to the output so backward has a graph.
#[derive(Debug, Clone, Copy)]
pub struct LabelMeanLoss;

impl LossFunction for LabelMeanLoss {
    fn forward<B: Backend>(
        &self,
        output: Tensor<B, 4>,
        labels: Tensor<B, 4, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let loss = labels.float().mean() + output.mean().mul_scalar(0.0);
        (loss.clone(), loss)
    }
}

// ─── RecordingMetrics ─────────────────────────────────────────────────────────
/// Returns `values` and remembers what it was called with.
#[derive(Default)]
pub struct RecordingMetrics {
    pub values: Vec<f64>,
    /// One entry per call: (label dims, first label of every sample)
    pub calls:  Mutex<Vec<([usize; 4], Vec<i64>)>>,
}

impl RecordingMetrics {
    pub fn returning(values: Vec<f64>) -> Self {
        Self { values, calls: Mutex::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl MetricsFunction for RecordingMetrics {
    fn compute<B: Backend>(&self, labels: Tensor<B, 4, Int>, outputs: Tensor<B, 4>) -> Result<Vec<f64>> {
        let dims = labels.dims();
        assert_eq!(outputs.dims()[0], dims[0]);
        let firsts = labels
            .slice([0..dims[0], 0..1, 0..1, 0..1])
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        self.calls.lock().unwrap().push((dims, firsts));
        Ok(self.values.clone())
    }
}

// ─── Recording sinks ──────────────────────────────────────────────────────────
#[derive(Default)]
struct Log {
    logged: Vec<(String, f64)>,
    ended:  Vec<usize>,
    panels: Vec<PathBuf>,
}

/// Shared handle onto what the sinks below received.
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Log>>);

impl Recorded {
    pub fn metric_sink(&self) -> Box<dyn MetricSink> {
        Box::new(RecordingMetricSink(self.clone()))
    }

    pub fn visual_sink(&self) -> Box<dyn VisualizationSink> {
        Box::new(RecordingVisualSink(self.clone()))
    }

    pub fn logged(&self) -> Vec<(String, f64)> {
        self.0.lock().unwrap().logged.clone()
    }

    pub fn ended_epochs(&self) -> Vec<usize> {
        self.0.lock().unwrap().ended.clone()
    }

    pub fn panels(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().panels.clone()
    }
}

struct RecordingMetricSink(Recorded);

impl MetricSink for RecordingMetricSink {
    fn log(&mut self, name: &str, value: f64, aggregation: Aggregation, sync_dist: bool) {
        assert_eq!(aggregation, Aggregation::EpochMean);
        assert!(sync_dist);
        self.0 .0.lock().unwrap().logged.push((name.to_string(), value));
    }

    fn end_epoch(&mut self, epoch: usize) -> Result<Vec<(String, f64)>> {
        self.0 .0.lock().unwrap().ended.push(epoch);
        Ok(Vec::new())
    }
}

struct RecordingVisualSink(Recorded);

impl VisualizationSink for RecordingVisualSink {
    fn save(&self, _panel: &Panel, path: &Path) -> Result<()> {
        self.0 .0.lock().unwrap().panels.push(path.to_path_buf());
        Ok(())
    }
}
