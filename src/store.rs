//! Local stand-in for the annotation backend.
//!
//! Each image keeps its tags and annotations in a JSON sidecar next to it
//! (`photo.jpg` → `photo.jpg.annotations.json`). A [`Project`] is the ordered
//! set of images being annotated together; its tag list is shared by all of
//! them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Annotation, BoxRect, Tag};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.file_name().unwrap_or_default().to_os_string();
    name.push(".annotations.json");
    image_path.with_file_name(name)
}

/// Reads an image's sidecar. A missing sidecar is an empty record.
pub fn load_record(image_path: &Path) -> Result<ImageRecord> {
    let path = sidecar_path(image_path);
    if !path.exists() {
        return Ok(ImageRecord::default());
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_record(image_path: &Path, record: &ImageRecord) -> Result<()> {
    let path = sidecar_path(image_path);
    let data = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))
}

/// Next id of the form `{prefix}-{n}` not used by `existing`.
fn fresh_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let max = existing
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}-{}", max + 1)
}

pub struct Project {
    images: Vec<PathBuf>,
    index: usize,
    tags: Vec<Tag>,
    annotations: Vec<Annotation>,
}

impl Project {
    /// Opens `images` for annotation, starting at the first one. Tags are
    /// gathered from every sidecar plus `extra_tags`.
    pub fn open(images: Vec<PathBuf>, extra_tags: &[String]) -> Result<Self> {
        if images.is_empty() {
            bail!("no images to annotate");
        }
        let mut project = Self {
            images,
            index: 0,
            tags: Vec::new(),
            annotations: Vec::new(),
        };
        for image in &project.images.clone() {
            match load_record(image) {
                Ok(record) => project.merge_tags(record.tags),
                Err(e) => log::warn!("{e:#}"),
            }
        }
        for name in extra_tags {
            project.add_tag(name);
        }
        project.load_current();
        Ok(project)
    }

    pub fn current_image(&self) -> &Path {
        &self.images[self.index]
    }

    /// 1-based position of the current image and the number of images.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.images.len())
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.images.len();
        self.load_current();
    }

    pub fn prev(&mut self) {
        self.index = (self.index + self.images.len() - 1) % self.images.len();
        self.load_current();
    }

    /// Appends an image (or jumps to it if already present) and makes it current.
    pub fn open_image(&mut self, path: PathBuf) {
        self.index = match self.images.iter().position(|p| *p == path) {
            Some(i) => i,
            None => {
                self.images.push(path);
                self.images.len() - 1
            }
        };
        self.load_current();
    }

    /// Adds a tag by name, or returns the existing tag with that name.
    /// Blank names are rejected.
    pub fn add_tag(&mut self, name: &str) -> Option<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(existing) = self.tags.iter().find(|t| t.name == name) {
            return Some(existing.clone());
        }
        let tag = Tag {
            id: fresh_id("tag", self.tags.iter().map(|t| t.id.as_str())),
            name: name.to_owned(),
        };
        self.tags.push(tag.clone());
        Some(tag)
    }

    /// Folds tags read from a sidecar into the project list. Tags are matched
    /// by name; a new tag whose id is already taken by another name gets a
    /// fresh id.
    fn merge_tags(&mut self, tags: Vec<Tag>) {
        for mut tag in tags {
            if self.tags.iter().any(|t| t.name == tag.name) {
                continue;
            }
            if self.tags.iter().any(|t| t.id == tag.id) {
                let id = fresh_id("tag", self.tags.iter().map(|t| t.id.as_str()));
                log::debug!("tag '{}' id {} already taken, using {id}", tag.name, tag.id);
                tag.id = id;
            }
            self.tags.push(tag);
        }
    }

    pub fn add_annotation(&mut self, rect: BoxRect, tag: &Tag) -> Result<Annotation> {
        let annotation = Annotation {
            id: fresh_id("ann", self.annotations.iter().map(|a| a.id.as_str())),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            tag: tag.clone(),
        };
        self.annotations.push(annotation.clone());
        self.save()?;
        Ok(annotation)
    }

    /// Removes an annotation by id. Returns whether it existed.
    pub fn delete_annotation(&mut self, id: &str) -> Result<bool> {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id != id);
        if self.annotations.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let record = ImageRecord {
            tags: self.tags.clone(),
            annotations: self.annotations.clone(),
        };
        save_record(self.current_image(), &record)
    }

    /// Reads the current image's sidecar. Its tags join the project list and
    /// its annotations are pointed at the project's tag of the same name.
    fn load_current(&mut self) {
        let record = match load_record(self.current_image()) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("{e:#}");
                ImageRecord::default()
            }
        };
        self.merge_tags(record.tags);
        // annotations may carry tags the sidecar's list lost
        self.merge_tags(record.annotations.iter().map(|a| a.tag.clone()).collect());
        self.annotations = record.annotations;
        for ann in &mut self.annotations {
            if let Some(tag) = self.tags.iter().find(|t| t.name == ann.tag.name) {
                ann.tag = tag.clone();
            }
        }
    }
}
