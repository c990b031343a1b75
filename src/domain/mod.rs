// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe what a training
// run IS, independent of the tensor framework.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, traits and pure logic
//
// The update schedule lives here on purpose: deciding WHEN
// to apply accumulated gradients is integer arithmetic and
// is unit-tested without a backend.
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Typed error taxonomy for the training loop
pub mod error;

// Training vs evaluation pass
pub mod mode;

// Gradient accumulation / optimizer step cadence
pub mod schedule;

// Host-side diagnostic image
pub mod panel;

// Per-epoch results and the run report
pub mod summary;

// Sinks the loop reports into
pub mod traits;
