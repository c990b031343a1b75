// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights as Burn named MessagePack
// records at full precision.
//
// File layout:
//   <dir_checkpoint>/
//     0.pth                ← weights after epoch 0
//     5.pth                ← weights after epoch 5
//     ...
//     latest_epoch.json    ← number of the last epoch saved
//     train_config.json    ← hyper-parameters of the run
//
// Checkpoints are append-only; nothing here deletes a file.
// The directory is created on first write, not on
// construction, so a run that never reaches a checkpoint
// leaves no trace on disk.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::TrainError;

pub const CONFIG_FILE: &str = "train_config.json";
const LATEST_FILE: &str = "latest_epoch.json";

type CheckpointRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{epoch}.pth"))
    }

    /// Write the full model record for `epoch` and move the latest-epoch
    /// pointer. Returns the path of the written checkpoint.
    pub fn save_model<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        epoch: usize,
    ) -> Result<PathBuf, TrainError> {
        let path = self.checkpoint_path(epoch);
        self.write_model::<B, M>(model, epoch, &path)
            .map_err(|source| TrainError::CheckpointWrite { path: path.clone(), source: source.into() })?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(path)
    }

    fn write_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize, path: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;

        let bytes = <CheckpointRecorder as Recorder<B>>::record(
            &CheckpointRecorder::default(),
            model.clone().into_record(),
            (),
        )
        .map_err(|e| anyhow!("serialising model record: {e:?}"))?;

        fs::write(path, bytes)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Cannot write {LATEST_FILE}"))?;
        Ok(())
    }

    /// Load weights into `model`. `epoch = None` picks the latest
    /// checkpoint. Returns the model and the epoch it came from.
    ///
    /// `model` must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        epoch:  Option<usize>,
        device: &B::Device,
    ) -> Result<(M, usize)> {
        let epoch = match epoch {
            Some(epoch) => epoch,
            None        => self.latest_epoch()?,
        };
        let path = self.checkpoint_path(epoch);
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let bytes = fs::read(&path).with_context(|| {
            format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
        })?;
        let record = <CheckpointRecorder as Recorder<B>>::load(&CheckpointRecorder::default(), bytes, device)
            .map_err(|e| anyhow!("decoding checkpoint '{}': {e:?}", path.display()))?;

        Ok((model.load_record(record), epoch))
    }

    /// Persist the run's hyper-parameters beside the checkpoints.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        TrainConfig::from_json_file(&path).with_context(|| {
            format!("Cannot read config from '{}'. Run 'train' before 'evaluate'.", path.display())
        })
    }

    /// Number of the last epoch written, from `latest_epoch.json`.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(s.trim())?)
    }
}
