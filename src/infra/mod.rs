// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// The file-backed implementations the loop writes through:
//
//   checkpoint.rs — model records (<epoch>.pth), the latest
//                   epoch pointer and train_config.json.
//                   Reloaded by `evaluate` to rebuild the
//                   model before loading its weights.
//
//   metrics.rs    — MetricSink that averages reported values
//                   per epoch and appends them to metrics.csv.
//
//   png.rs        — VisualizationSink that encodes diagnostic
//                   panels as greyscale PNG files.
//
// Keeping these behind the domain traits lets the training
// loop be tested with in-memory sinks.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-epoch metric aggregation and CSV logging
pub mod metrics;

/// PNG writer for diagnostic panels
pub mod png;
