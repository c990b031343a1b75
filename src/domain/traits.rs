// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The loop reports into sinks it does not own the
// implementation of. Programming against these traits lets
// the binary write PNGs and CSV files while tests record
// calls in memory:
//
//   - MetricsLogger (infra)  implements MetricSink
//   - PngPanelSink  (infra)  implements VisualizationSink
//   - BatchLoader is implemented by the burn DataLoader
//     adapter and by plain Vecs (data/loader.rs)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Trait Objects)

use std::path::Path;

use anyhow::Result;

use crate::domain::panel::Panel;

// ─── BatchLoader ──────────────────────────────────────────────────────────────
/// A finite, restartable sequence of batches whose length is known
/// before iterating.
pub trait BatchLoader<T> {
    /// Number of batches one call to `batches` yields.
    fn num_batches(&self) -> usize;

    /// Start a fresh pass over the batches.
    fn batches(&self) -> Box<dyn Iterator<Item = T> + '_>;
}

// ─── MetricSink ───────────────────────────────────────────────────────────────
/// How repeated reports of the same name within an epoch are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Mean over every report made during the epoch.
    EpochMean,
}

/// The structured logging facility.
///
/// Values are aggregated per epoch, never emitted per step. When
/// `sync_dist` is set the implementation must reduce the value across
/// replicas before it is recorded; a single process is its own
/// reduction.
pub trait MetricSink {
    fn log(&mut self, name: &str, value: f64, aggregation: Aggregation, sync_dist: bool);

    /// Close the epoch: emit the aggregated values and reset.
    fn end_epoch(&mut self, epoch: usize) -> Result<Vec<(String, f64)>>;
}

// ─── VisualizationSink ────────────────────────────────────────────────────────
/// Persists a rendered diagnostic panel.
pub trait VisualizationSink {
    /// Write `panel` to `path`, replacing any existing file.
    fn save(&self, panel: &Panel, path: &Path) -> Result<()>;
}
