// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// The MetricSink used by the binary. Values reported during
// an epoch are averaged per name; at the end of the epoch the
// means are appended to a CSV file and the buffers reset.
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   epoch,name,value
//   0,train_loss,1.482310
//   0,val_loss,1.401127
//   0,auc0,0.731200
//   1,train_loss,1.207745
//   ...
//
// One long-format row per (epoch, name) keeps the header
// stable however many metric values the metrics function
// returns.
//
// sync_dist: this process is the only replica, so the
// cross-replica reduction is the identity.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::traits::{Aggregation, MetricSink};

const CSV_HEADER: &str = "epoch,name,value";

/// One row of the metrics CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub epoch: usize,
    pub name:  String,
    pub value: f64,
}

/// Running sum for one metric name within the current epoch
#[derive(Debug, Clone)]
struct Running {
    name:  String,
    sum:   f64,
    count: usize,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
    /// First-report order, so CSV rows come out in a stable order
    pending:  Vec<Running>,
}

impl MetricsLogger {
    /// Create the logger, writing the CSV header if the file is new.
    /// An existing file is appended to across runs.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, pending: Vec::new() })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    fn append(&self, rows: &[MetricRow]) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        for row in rows {
            writeln!(f, "{},{},{:.6}", row.epoch, row.name, row.value)?;
        }
        Ok(())
    }
}

impl MetricSink for MetricsLogger {
    fn log(&mut self, name: &str, value: f64, aggregation: Aggregation, _sync_dist: bool) {
        match aggregation {
            Aggregation::EpochMean => match self.pending.iter_mut().find(|r| r.name == name) {
                Some(running) => {
                    running.sum   += value;
                    running.count += 1;
                }
                None => self.pending.push(Running { name: name.to_string(), sum: value, count: 1 }),
            },
        }
    }

    fn end_epoch(&mut self, epoch: usize) -> Result<Vec<(String, f64)>> {
        let rows: Vec<MetricRow> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|r| MetricRow { epoch, name: r.name, value: r.sum / r.count as f64 })
            .collect();

        self.append(&rows)?;
        tracing::debug!("Logged {} metrics for epoch {}", rows.len(), epoch);

        Ok(rows.into_iter().map(|r| (r.name, r.value)).collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_mean_per_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(tmp.path()).unwrap();

        logger.log("train_loss", 1.0, Aggregation::EpochMean, true);
        logger.log("val_loss", 0.5, Aggregation::EpochMean, true);
        logger.log("train_loss", 3.0, Aggregation::EpochMean, true);

        let means = logger.end_epoch(0).unwrap();
        assert_eq!(means, vec![("train_loss".to_string(), 2.0), ("val_loss".to_string(), 0.5)]);
    }

    #[test]
    fn test_epochs_do_not_mix() {
        let tmp = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(tmp.path()).unwrap();

        logger.log("auc0", 0.25, Aggregation::EpochMean, true);
        logger.end_epoch(0).unwrap();
        logger.log("auc0", 0.75, Aggregation::EpochMean, true);
        logger.end_epoch(1).unwrap();
        assert!(logger.end_epoch(2).unwrap().is_empty());

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv, "epoch,name,value\n0,auc0,0.250000\n1,auc0,0.750000\n");
    }

    #[test]
    fn test_existing_file_is_appended() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut logger = MetricsLogger::new(tmp.path()).unwrap();
            logger.log("val_loss", 1.0, Aggregation::EpochMean, false);
            logger.end_epoch(0).unwrap();
        }
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv.lines().filter(|l| *l == CSV_HEADER).count(), 1);
        assert_eq!(csv.lines().count(), 2);
    }
}
