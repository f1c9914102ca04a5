use image::{Rgba, RgbaImage};

use crate::gesture::DrawSession;
use crate::model::Annotation;

pub const STROKE_WIDTH: f32 = 3.0;
pub const STROKE_COLOR: Rgba<u8> = Rgba([0x00, 0xff, 0x00, 0xff]);

/// A rectangle of surface pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    fn union(self, other: Region) -> Region {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Region {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

/// What changed since the GPU copy was last refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Damage {
    Full,
    Region(Region),
}

/// Backing pixel buffer of the canvas. Its size always tracks the loaded
/// bitmap's natural size; with nothing loaded it is empty.
///
/// `base` holds the bitmap with the committed annotations, `pixels` adds the
/// live candidate on top. Moving the candidate only restores and restrokes
/// the pixels it covers.
pub struct Surface {
    base: RgbaImage,
    pixels: RgbaImage,
    candidate: Option<Region>,
    damage: Option<Damage>,
    revision: u64,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            base: RgbaImage::new(0, 0),
            pixels: RgbaImage::new(0, 0),
            candidate: None,
            damage: None,
            revision: 0,
        }
    }
}

impl Surface {
    pub fn size(&self) -> [u32; 2] {
        [self.pixels.width(), self.pixels.height()]
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Bumped on every change; used to know when the GPU copy is out of date.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns and resets the damage accumulated since the last call.
    pub fn take_damage(&mut self) -> Option<Damage> {
        self.damage.take()
    }

    pub fn clear(&mut self) {
        self.base = RgbaImage::new(0, 0);
        self.pixels = RgbaImage::new(0, 0);
        self.candidate = None;
        self.mark(Damage::Full);
    }

    /// Full repaint: bitmap, then every committed annotation in order, then
    /// the live candidate if a drag is in progress.
    pub fn repaint(
        &mut self,
        bitmap: Option<&RgbaImage>,
        annotations: &[Annotation],
        candidate: Option<&DrawSession>,
    ) {
        self.candidate = None;
        self.mark(Damage::Full);
        let Some(bitmap) = bitmap else {
            self.base = RgbaImage::new(0, 0);
            self.pixels = RgbaImage::new(0, 0);
            return;
        };

        if self.base.dimensions() == bitmap.dimensions() {
            self.base.copy_from_slice(bitmap.as_raw());
        } else {
            self.base = bitmap.clone();
        }
        for ann in annotations {
            let r = ann.rect();
            stroke_rect(&mut self.base, r.x, r.y, r.width, r.height);
        }

        if self.pixels.dimensions() == self.base.dimensions() {
            self.pixels.copy_from_slice(self.base.as_raw());
        } else {
            self.pixels = self.base.clone();
        }
        if let Some(session) = candidate {
            self.stroke_candidate(session);
        }
    }

    /// Moves (or removes) the live candidate without touching the rest of
    /// the surface.
    pub fn update_candidate(&mut self, candidate: Option<&DrawSession>) {
        if self.is_blank() {
            return;
        }
        let old = self.candidate.take();
        if let Some(region) = old {
            self.restore(region);
        }
        if let Some(session) = candidate {
            self.stroke_candidate(session);
        }
        let changed = match (old, self.candidate) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        if let Some(region) = changed {
            self.mark(Damage::Region(region));
        }
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        let size = [self.pixels.width() as usize, self.pixels.height() as usize];
        egui::ColorImage::from_rgba_unmultiplied(size, self.pixels.as_raw())
    }

    /// Copy of one region, for partial texture updates.
    pub fn region_image(&self, region: Region) -> egui::ColorImage {
        let mut rgba = Vec::with_capacity((region.width * region.height * 4) as usize);
        for row in region.y..region.y + region.height {
            let (start, end) = self.row_span(region, row);
            rgba.extend_from_slice(&self.pixels.as_raw()[start..end]);
        }
        egui::ColorImage::from_rgba_unmultiplied(
            [region.width as usize, region.height as usize],
            &rgba,
        )
    }

    fn stroke_candidate(&mut self, session: &DrawSession) {
        let (origin, extent) = session.candidate();
        stroke_rect(&mut self.pixels, origin.x, origin.y, extent.x, extent.y);
        self.candidate = stroke_region(origin.x, origin.y, extent.x, extent.y, self.size());
    }

    fn restore(&mut self, region: Region) {
        for row in region.y..region.y + region.height {
            let (start, end) = self.row_span(region, row);
            let src = &self.base.as_raw()[start..end];
            (*self.pixels)[start..end].copy_from_slice(src);
        }
    }

    fn row_span(&self, region: Region, row: u32) -> (usize, usize) {
        let start = ((row * self.pixels.width() + region.x) * 4) as usize;
        (start, start + (region.width * 4) as usize)
    }

    fn mark(&mut self, damage: Damage) {
        self.revision += 1;
        self.damage = match (self.damage, damage) {
            (Some(Damage::Region(a)), Damage::Region(b)) => Some(Damage::Region(a.union(b))),
            (None, d) => Some(d),
            _ => Some(Damage::Full),
        };
    }
}

/// Pixels touched by [`stroke_rect`] for this rectangle, clipped to `size`.
fn stroke_region(x: f32, y: f32, width: f32, height: f32, size: [u32; 2]) -> Option<Region> {
    let pad = STROKE_WIDTH / 2.0 + 1.0;
    let clip = |lo: f32, hi: f32, max: u32| {
        let a = (lo - pad).floor().max(0.0).min(max as f32) as u32;
        let b = (hi + pad).ceil().max(0.0).min(max as f32) as u32;
        (a, b)
    };
    let (x0, x1) = clip(x.min(x + width), x.max(x + width), size[0]);
    let (y0, y1) = clip(y.min(y + height), y.max(y + height), size[1]);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Region {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Strokes a rectangle outline centred on its edges. Width and height may be
/// negative, in which case the rectangle extends left/up from `(x, y)`.
pub fn stroke_rect(img: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32) {
    let (x0, x1) = (x.min(x + width), x.max(x + width));
    let (y0, y1) = (y.min(y + height), y.max(y + height));
    let h = STROKE_WIDTH / 2.0;

    // top, bottom, left, right
    fill_band(img, x0 - h, y0 - h, x1 + h, y0 + h);
    fill_band(img, x0 - h, y1 - h, x1 + h, y1 + h);
    fill_band(img, x0 - h, y0 + h, x0 + h, y1 - h);
    fill_band(img, x1 - h, y0 + h, x1 + h, y1 - h);
}

/// Paints every pixel whose centre lies in `[xa, xb) × [ya, yb)`.
fn fill_band(img: &mut RgbaImage, xa: f32, ya: f32, xb: f32, yb: f32) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let first = |a: f32| (a - 0.5).ceil() as i64;
    let px0 = first(xa).max(0);
    let px1 = first(xb).min(w);
    let py0 = first(ya).max(0);
    let py1 = first(yb).min(h);

    for py in py0..py1 {
        for px in px0..px1 {
            img.put_pixel(px as u32, py as u32, STROKE_COLOR);
        }
    }
}
