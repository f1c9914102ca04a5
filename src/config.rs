use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::model::ToolMode;

pub const DEFAULT_WINDOW_WIDTH: f32 = 1200.0;
pub const DEFAULT_WINDOW_HEIGHT: f32 = 800.0;

#[derive(Parser, Debug)]
#[command(name = "annotate-canvas", version, about = "Draw tagged bounding boxes on images")]
pub struct Config {
    /// Images to annotate, navigated with Prev/Next in the given order.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Tool active at startup: `box` or `select`.
    #[arg(long, default_value = "box")]
    pub tool: ToolMode,

    /// Tag to make available (repeatable).
    #[arg(long = "tag", value_name = "NAME")]
    pub tags: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_WINDOW_WIDTH)]
    pub width: f32,

    #[arg(long, default_value_t = DEFAULT_WINDOW_HEIGHT)]
    pub height: f32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for image in &self.images {
            if !image.is_file() {
                bail!("file not found: {}", image.display());
            }
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            bail!("window size must be positive, got {}x{}", self.width, self.height);
        }
        Ok(())
    }
}
