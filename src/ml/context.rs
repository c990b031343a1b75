// ============================================================
// Layer 5 — Execution Context
// ============================================================
// Resolved once from the config, then threaded through the
// step executor so no code path re-inspects `legacy` / `cpu`:
//
//   legacy  cpu    placement             structured logging
//   ------  -----  --------------------  ------------------
//   false   any    Managed               on
//   true    true   Managed               off
//   true    false  Explicit(accelerator) off
//
// Managed: batches stay where the loader built them (the
// loader already targets the run's device). Explicit: every
// batch is transferred to the device before the forward pass,
// which requires an accelerator to exist.

use burn::prelude::*;

use crate::data::batcher::ImageBatch;
use crate::domain::error::TrainError;

#[derive(Debug, Clone, PartialEq)]
pub enum Placement<D> {
    Managed,
    Explicit(D),
}

#[derive(Debug, Clone)]
pub struct ExecutionContext<D> {
    placement:          Placement<D>,
    structured_logging: bool,
}

impl<D: Clone> ExecutionContext<D> {
    /// Resolve placement and logging from the two legacy flags.
    ///
    /// `accelerator` is the device to transfer to when explicit placement
    /// is requested; `None` means this build has no accelerator.
    pub fn resolve(legacy: bool, cpu: bool, accelerator: Option<D>) -> Result<Self, TrainError> {
        let placement = if legacy && !cpu {
            match accelerator {
                Some(device) => Placement::Explicit(device),
                None => {
                    return Err(TrainError::Device(
                        "legacy mode requests an accelerator but none is available; pass --cpu".into(),
                    ))
                }
            }
        } else {
            Placement::Managed
        };
        Ok(Self { placement, structured_logging: !legacy })
    }

    /// Managed placement with structured logging.
    #[cfg(test)]
    pub fn managed() -> Self {
        Self { placement: Placement::Managed, structured_logging: true }
    }

    #[cfg(test)]
    pub fn with_structured_logging(mut self, enabled: bool) -> Self {
        self.structured_logging = enabled;
        self
    }

    pub fn placement(&self) -> &Placement<D> {
        &self.placement
    }

    pub fn structured_logging(&self) -> bool {
        self.structured_logging
    }

    pub fn place<B: Backend<Device = D>>(&self, batch: ImageBatch<B>) -> ImageBatch<B> {
        match &self.placement {
            Placement::Managed          => batch,
            Placement::Explicit(device) => batch.to_device(device),
        }
    }
}
