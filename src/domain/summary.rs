// ============================================================
// Layer 3 — Epoch Summary and Run Report
// ============================================================
// One EpochSummary per completed epoch, printed with a fixed
// template so logs from different runs line up:
//
//   Epoch: 3 Time: 12.04  Train Loss: 0.4120  Val Loss: 0.3981  Metrics: 0.9123 0.8870
//
// TrainingReport collects the summaries plus everything the
// checkpoint policy did, including writes that failed. A
// failed write is logged and training continues.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 0-based epoch index
    pub epoch: usize,

    /// Wall-clock time spent on the training and evaluation passes
    pub elapsed: Duration,

    /// Mean training loss (see `schedule::epoch_loss_divisor`)
    pub train_loss: f64,

    /// Mean evaluation loss
    pub val_loss: f64,

    /// Output of the metrics function, in its order
    pub metrics: Vec<f64>,
}

impl EpochSummary {
    /// Render the progress line printed after every epoch.
    pub fn progress_line(&self) -> String {
        let mut line = format!(
            "Epoch: {} Time: {:.2}  Train Loss: {:.4}  Val Loss: {:.4}  Metrics: ",
            self.epoch,
            self.elapsed.as_secs_f64(),
            self.train_loss,
            self.val_loss,
        );
        for m in &self.metrics {
            // writing into a String cannot fail
            let _ = write!(line, "{m:.4} ");
        }
        line
    }
}

/// A checkpoint that could not be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointFailure {
    pub epoch: usize,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct TrainingReport {
    pub epochs:              Vec<EpochSummary>,
    pub checkpoints:         Vec<PathBuf>,
    pub checkpoint_failures: Vec<CheckpointFailure>,
}

impl TrainingReport {
    pub fn last(&self) -> Option<&EpochSummary> {
        self.epochs.last()
    }
}
