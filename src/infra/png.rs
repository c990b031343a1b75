// ============================================================
// Layer 6 — PNG Panel Sink
// ============================================================
// Writes diagnostic panels as 8-bit greyscale PNGs, creating
// the parent directory (e.g. <output_dir>/images) on demand.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use image::GrayImage;

use crate::domain::{panel::Panel, traits::VisualizationSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct PngPanelSink;

impl VisualizationSink for PngPanelSink {
    fn save(&self, panel: &Panel, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        let img = GrayImage::from_raw(panel.width as u32, panel.height as u32, panel.to_luma8())
            .ok_or_else(|| anyhow!("panel buffer does not match {}x{}", panel.width, panel.height))?;
        img.save(path)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }
}
