//! Background image decoding.
//!
//! Every request bumps a generation counter and decodes on its own worker
//! thread. Completions travel back over a channel tagged with the generation
//! they were issued under; only the newest generation is ever accepted, so a
//! slow decode for a URL that has since been replaced is dropped on arrival.

use std::path::Path;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;

pub type Generation = u64;

#[derive(Debug)]
pub struct LoadCompletion {
    pub generation: Generation,
    pub url: String,
    pub result: Result<RgbaImage, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Empty,
    Loading { url: String },
    Ready { url: String },
    Failed { url: String, message: String },
}

pub struct ImageLoader {
    generation: Generation,
    url: Option<String>,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
    repaint: Option<egui::Context>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            generation: 0,
            url: None,
            tx,
            rx,
            repaint: None,
        }
    }

    /// Wakes the UI when a decode finishes, so the result shows up without
    /// waiting for the next input event.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Starts a new generation for `url` without decoding anything. The bitmap
    /// is expected as a [`LoadCompletion`] carrying the returned generation.
    pub fn begin(&mut self, url: &str) -> Generation {
        self.generation += 1;
        self.url = Some(url.to_owned());
        self.generation
    }

    /// Supersedes any in-flight load and starts decoding `url` in the background.
    pub fn request(&mut self, url: &str) -> Generation {
        let generation = self.begin(url);
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        let owned = url.to_owned();

        let spawned = std::thread::Builder::new()
            .name(format!("image-loader-{generation}"))
            .spawn(move || {
                let result = decode_url(&owned).map_err(|e| format!("{e:#}"));
                let _ = tx.send(LoadCompletion {
                    generation,
                    url: owned,
                    result,
                });
                if let Some(ctx) = repaint {
                    ctx.request_repaint();
                }
            });

        if let Err(e) = spawned {
            log::error!("could not spawn image loader for '{url}': {e}");
            let _ = self.tx.send(LoadCompletion {
                generation,
                url: url.to_owned(),
                result: Err(e.to_string()),
            });
        }
        generation
    }

    /// Whether `completion` belongs to the most recent request.
    pub fn is_current(&self, completion: &LoadCompletion) -> bool {
        completion.generation == self.generation
    }

    /// Drains finished loads and returns the one for the latest request, if
    /// it has arrived. Stale completions are logged and dropped.
    pub fn poll(&mut self) -> Option<LoadCompletion> {
        let mut latest = None;
        for completion in self.rx.try_iter() {
            if self.is_current(&completion) {
                latest = Some(completion);
            } else {
                log::debug!(
                    "discarding stale load of '{}' (generation {}, current {})",
                    completion.url,
                    completion.generation,
                    self.generation
                );
            }
        }
        latest
    }
}

/// Decodes a local path, accepting an optional `file://` prefix.
pub fn decode_url(url: &str) -> Result<RgbaImage> {
    let path = url.strip_prefix("file://").unwrap_or(url);
    let img = image::open(Path::new(path)).with_context(|| format!("failed to decode '{url}'"))?;
    Ok(img.to_rgba8())
}
