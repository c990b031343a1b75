// ============================================================
// Layer 3 — Update Schedule
// ============================================================
// Gradient accumulation: gradients from several micro-batches
// are summed before one optimizer step, which simulates a
// larger effective batch:
//
//   window = batch_update / batch_size     (micro-batches per step)
//
//   i:       0   1   2   3   4   5   6      (window = 3, 7 batches)
//   update:  .   .   X   .   .   X   X      ← last batch always flushes
//
// The trigger counts completed micro-batches (i + 1), so the
// first step happens after a full window rather than on i = 0.
// The final batch always flushes whatever is left so no
// gradient is carried into the next epoch.

use crate::domain::{error::TrainError, mode::Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSchedule {
    window:     usize,
    last_index: usize,
}

impl UpdateSchedule {
    /// Build the schedule for one pass over `num_batches` micro-batches.
    ///
    /// Fails with `EmptyLoader` when there is nothing to iterate.
    /// `window` is validated > 0 by the config layer; a zero is
    /// treated as 1 here so the modulo can never fault.
    pub fn new(window: usize, num_batches: usize) -> Result<Self, TrainError> {
        if num_batches == 0 {
            return Err(TrainError::EmptyLoader { mode: Mode::Train });
        }
        Ok(Self {
            window:     window.max(1),
            last_index: num_batches - 1,
        })
    }

    /// True when the optimizer should step (and then clear gradients)
    /// after micro-batch `i` (0-based).
    pub fn should_update(&self, i: usize) -> bool {
        (i + 1) % self.window == 0 || i == self.last_index
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    /// Number of optimizer steps one full pass performs.
    pub fn updates_per_pass(&self) -> usize {
        (0..=self.last_index).filter(|&i| self.should_update(i)).count()
    }
}

/// Divisor for an epoch's mean loss: the index of the final batch.
///
/// With N dense batches this is N - 1, so the reported mean is
/// biased high by N / (N - 1). Kept for comparability with
/// historic runs; a single-batch pass divides by 1 instead of 0.
pub fn epoch_loss_divisor(final_index: usize) -> f64 {
    final_index.max(1) as f64
}
