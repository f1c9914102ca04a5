//! The annotation canvas widget.
//!
//! Renders a bitmap with its rectangle annotations and turns primary-button
//! drags into new rectangles in image pixel space. The widget owns no
//! annotation data: the caller passes the committed list in every frame and
//! receives finished rectangles through a callback.

use egui::{Pos2, Rect, Sense};
use image::RgbaImage;

use crate::geometry::{client_to_image, fit_surface};
use crate::gesture::{GestureOutcome, GestureState};
use crate::loader::{Generation, ImageLoader, LoadCompletion, LoadStatus};
use crate::model::{Annotation, BoxRect, ToolMode};
use crate::surface::{Damage, Surface};

#[derive(Debug)]
pub enum CanvasEvent {
    /// `bounds` is the surface's on-screen rectangle, `None` if it is not laid out.
    PointerDown { pos: Pos2, bounds: Option<Rect> },
    PointerMove { pos: Pos2, bounds: Option<Rect> },
    PointerUp { pos: Pos2, bounds: Option<Rect> },
    /// The pointer left the surface or the interaction was interrupted.
    PointerCancel,
    ImageLoaded(LoadCompletion),
}

struct LoadedBitmap {
    generation: Generation,
    image: RgbaImage,
}

pub struct AnnotationCanvas {
    tool_mode: ToolMode,
    annotations: Vec<Annotation>,
    gesture: GestureState,
    loader: ImageLoader,
    status: LoadStatus,
    bitmap: Option<LoadedBitmap>,
    surface: Surface,
    // full repaint pending
    dirty: bool,
    // only the live candidate moved
    candidate_dirty: bool,

    texture: Option<egui::TextureHandle>,
    texture_revision: u64,
}

impl Default for AnnotationCanvas {
    fn default() -> Self {
        Self::new(ImageLoader::new())
    }
}

impl AnnotationCanvas {
    pub fn new(loader: ImageLoader) -> Self {
        Self {
            tool_mode: ToolMode::default(),
            annotations: Vec::new(),
            gesture: GestureState::Idle,
            loader,
            status: LoadStatus::Empty,
            bitmap: None,
            surface: Surface::default(),
            dirty: false,
            candidate_dirty: false,
            texture: None,
            texture_revision: 0,
        }
    }

    // ── Props ───────────────────────────────────────────────────────────────

    /// Points the canvas at a new image. Any in-flight load is superseded and
    /// any drag in progress is dropped. Setting the current URL again is a no-op.
    pub fn set_image_url(&mut self, url: &str) {
        if self.loader.url() == Some(url) {
            return;
        }
        self.gesture.cancel();
        self.bitmap = None;
        self.surface.clear();
        self.loader.request(url);
        self.status = LoadStatus::Loading {
            url: url.to_owned(),
        };
        log::debug!("loading '{url}' (generation {})", self.loader.generation());
    }

    /// Like [`Self::set_image_url`] but without starting a decode; the bitmap is
    /// expected as an [`CanvasEvent::ImageLoaded`] for the returned generation.
    pub fn begin_image(&mut self, url: &str) -> Generation {
        self.gesture.cancel();
        self.bitmap = None;
        self.surface.clear();
        self.status = LoadStatus::Loading {
            url: url.to_owned(),
        };
        self.loader.begin(url)
    }

    pub fn set_annotations(&mut self, annotations: &[Annotation]) {
        if self.annotations != annotations {
            self.annotations = annotations.to_vec();
            self.dirty = true;
        }
    }

    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        if self.tool_mode == mode {
            return;
        }
        self.tool_mode = mode;
        if mode != ToolMode::Box && self.gesture.cancel() {
            self.candidate_dirty = true;
        }
    }

    // ── State ───────────────────────────────────────────────────────────────

    pub fn tool_mode(&self) -> ToolMode {
        self.tool_mode
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.bitmap.is_some()
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_drawing()
    }

    /// Generation of the bitmap currently shown, if any.
    pub fn loaded_generation(&self) -> Option<Generation> {
        self.bitmap.as_ref().map(|b| b.generation)
    }

    /// Surface with every pending change painted in.
    pub fn surface(&mut self) -> &Surface {
        self.flush();
        &self.surface
    }

    // ── Events ──────────────────────────────────────────────────────────────

    /// Applies one event and returns the rectangle if it completed a box.
    pub fn handle(&mut self, event: CanvasEvent) -> Option<BoxRect> {
        match event {
            CanvasEvent::ImageLoaded(completion) => {
                self.apply_load(completion);
                None
            }
            CanvasEvent::PointerCancel => {
                if self.gesture.cancel() {
                    self.candidate_dirty = true;
                }
                None
            }
            CanvasEvent::PointerDown { pos, bounds } => {
                if !self.is_loaded() {
                    return None;
                }
                let mapped = self.map(pos, bounds);
                let outcome = self.gesture.pointer_down(self.tool_mode, mapped);
                self.on_outcome(outcome)
            }
            CanvasEvent::PointerMove { pos, bounds } => {
                let mapped = self.map(pos, bounds);
                let outcome = self.gesture.pointer_move(mapped);
                self.on_outcome(outcome)
            }
            CanvasEvent::PointerUp { pos, bounds } => {
                let mapped = self.map(pos, bounds);
                let outcome = self.gesture.pointer_up(mapped);
                self.on_outcome(outcome)
            }
        }
    }

    /// Picks up finished background loads. Returns whether anything changed.
    pub fn poll_loads(&mut self) -> bool {
        match self.loader.poll() {
            Some(completion) => {
                self.apply_load(completion);
                true
            }
            None => false,
        }
    }

    /// Maps against the bitmap's natural size, which the surface adopts on
    /// its next repaint.
    fn map(&self, pos: Pos2, bounds: Option<Rect>) -> Option<Pos2> {
        let (w, h) = self.bitmap.as_ref()?.image.dimensions();
        client_to_image(pos, bounds?, [w, h])
    }

    fn on_outcome(&mut self, outcome: GestureOutcome) -> Option<BoxRect> {
        match outcome {
            GestureOutcome::Ignored => None,
            GestureOutcome::Started | GestureOutcome::Updated => {
                self.candidate_dirty = true;
                None
            }
            GestureOutcome::Discarded => {
                log::debug!("drag below minimum size, ignored");
                self.candidate_dirty = true;
                None
            }
            GestureOutcome::Committed(rect) => {
                log::debug!("box drawn: {rect:?}");
                self.candidate_dirty = true;
                Some(rect)
            }
        }
    }

    fn apply_load(&mut self, completion: LoadCompletion) {
        if !self.loader.is_current(&completion) {
            log::debug!(
                "ignoring superseded image '{}' (generation {})",
                completion.url,
                completion.generation
            );
            return;
        }
        match completion.result {
            Ok(image) => {
                log::info!(
                    "loaded '{}' ({}x{})",
                    completion.url,
                    image.width(),
                    image.height()
                );
                self.bitmap = Some(LoadedBitmap {
                    generation: completion.generation,
                    image,
                });
                self.status = LoadStatus::Ready {
                    url: completion.url,
                };
            }
            Err(message) => {
                log::warn!("could not load '{}': {message}", completion.url);
                self.bitmap = None;
                self.status = LoadStatus::Failed {
                    url: completion.url,
                    message,
                };
            }
        }
        self.gesture.cancel();
        self.dirty = true;
        // surface size follows the bitmap from here on
        self.flush();
    }

    fn flush(&mut self) {
        if self.dirty {
            self.dirty = false;
            self.candidate_dirty = false;
            self.surface.repaint(
                self.bitmap.as_ref().map(|b| &b.image),
                &self.annotations,
                self.gesture.session(),
            );
        } else if self.candidate_dirty {
            self.candidate_dirty = false;
            self.surface.update_candidate(self.gesture.session());
        }
    }

    // ── egui ────────────────────────────────────────────────────────────────

    /// Draws the canvas into `ui`, feeding pointer input through [`Self::handle`].
    /// `on_annotation_created` runs once per completed box.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        mut on_annotation_created: impl FnMut(BoxRect),
    ) -> egui::Response {
        if self.poll_loads() {
            ui.ctx().request_repaint();
        }
        self.flush();

        if self.surface.is_blank() {
            let text = match &self.status {
                LoadStatus::Empty => "No image".to_owned(),
                LoadStatus::Loading { url } => format!("Loading {url}…"),
                LoadStatus::Failed { url, .. } => format!("Could not load {url}"),
                LoadStatus::Ready { .. } => String::new(),
            };
            return ui.label(text);
        }

        let available = Rect::from_min_size(Pos2::ZERO, ui.available_size());
        let display = fit_surface(available, self.surface.size()).size();
        let sense = if self.tool_mode == ToolMode::Box {
            Sense::click_and_drag()
        } else {
            Sense::hover()
        };
        let (mut response, painter) = ui.allocate_painter(display, sense);
        let bounds = Some(response.rect);

        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui
                .ctx()
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(pos) = origin {
                self.handle(CanvasEvent::PointerDown { pos, bounds });
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.handle(CanvasEvent::PointerMove { pos, bounds });
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            let end = response
                .interact_pointer_pos()
                .or(ui.ctx().input(|i| i.pointer.latest_pos()));
            let created = match end {
                Some(pos) => self.handle(CanvasEvent::PointerUp { pos, bounds }),
                None => self.handle(CanvasEvent::PointerCancel),
            };
            if let Some(rect) = created {
                on_annotation_created(rect);
                response.mark_changed();
            }
        }

        self.flush();
        self.upload(ui.ctx());
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                response.rect,
                Rect::from_min_max(Pos2::ZERO, egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        if self.tool_mode == ToolMode::Box {
            response = response.on_hover_cursor(egui::CursorIcon::Crosshair);
        }
        response
    }

    fn upload(&mut self, ctx: &egui::Context) {
        let revision = self.surface.revision();
        if self.texture.is_some() && self.texture_revision == revision {
            return;
        }
        let damage = self.surface.take_damage();
        if let Some(texture) = &mut self.texture {
            match damage {
                Some(Damage::Region(region)) => texture.set_partial(
                    [region.x as usize, region.y as usize],
                    self.surface.region_image(region),
                    egui::TextureOptions::LINEAR,
                ),
                _ => texture.set(self.surface.to_color_image(), egui::TextureOptions::LINEAR),
            }
        } else {
            self.texture = Some(ctx.load_texture(
                "annotation_canvas",
                self.surface.to_color_image(),
                egui::TextureOptions::LINEAR,
            ));
        }
        self.texture_revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;
    use crate::surface::STROKE_COLOR;
    use egui::pos2;

    fn at_natural_size(w: f32, h: f32) -> Option<Rect> {
        Some(Rect::from_min_size(Pos2::ZERO, egui::vec2(w, h)))
    }

    fn loaded(w: u32, h: u32) -> AnnotationCanvas {
        let mut canvas = AnnotationCanvas::default();
        let generation = canvas.begin_image("mem://test");
        canvas.handle(CanvasEvent::ImageLoaded(LoadCompletion {
            generation,
            url: "mem://test".to_owned(),
            result: Ok(RgbaImage::new(w, h)),
        }));
        canvas
    }

    fn drag(canvas: &mut AnnotationCanvas, from: Pos2, to: Pos2) -> Option<BoxRect> {
        let bounds = at_natural_size(100.0, 100.0);
        canvas.handle(CanvasEvent::PointerDown { pos: from, bounds });
        canvas.handle(CanvasEvent::PointerMove { pos: to, bounds });
        canvas.handle(CanvasEvent::PointerUp { pos: to, bounds })
    }

    #[test]
    fn gestures_wait_for_the_image() {
        let mut canvas = AnnotationCanvas::default();
        canvas.begin_image("mem://pending");
        assert_eq!(drag(&mut canvas, pos2(10.0, 10.0), pos2(50.0, 50.0)), None);
        assert!(!canvas.is_drawing());
    }

    #[test]
    fn draws_a_box_once_loaded() {
        let mut canvas = loaded(100, 100);
        assert_eq!(
            drag(&mut canvas, pos2(10.0, 10.0), pos2(20.0, 20.0)),
            Some(BoxRect { x: 10.0, y: 10.0, width: 10.0, height: 10.0 })
        );
    }

    #[test]
    fn draws_right_after_load_and_maps_against_the_new_bitmap() {
        let mut canvas = AnnotationCanvas::default();
        let first = canvas.begin_image("mem://big");
        canvas.handle(CanvasEvent::ImageLoaded(LoadCompletion {
            generation: first,
            url: "mem://big".to_owned(),
            result: Ok(RgbaImage::new(200, 200)),
        }));
        assert_eq!(canvas.surface.size(), [200, 200]);

        let second = canvas.begin_image("mem://small");
        canvas.handle(CanvasEvent::ImageLoaded(LoadCompletion {
            generation: second,
            url: "mem://small".to_owned(),
            result: Ok(RgbaImage::new(50, 50)),
        }));
        // no surface() or show() in between
        assert_eq!(canvas.surface.size(), [50, 50]);
        assert_eq!(
            drag(&mut canvas, pos2(20.0, 20.0), pos2(60.0, 60.0)),
            Some(BoxRect { x: 10.0, y: 10.0, width: 20.0, height: 20.0 })
        );
    }

    #[test]
    fn moving_candidate_skips_full_repaint() {
        let mut canvas = loaded(100, 100);
        let bounds = at_natural_size(100.0, 100.0);
        // as if the loaded frame had been uploaded
        assert_eq!(canvas.surface.take_damage(), Some(Damage::Full));
        canvas.handle(CanvasEvent::PointerDown { pos: pos2(10.0, 10.0), bounds });
        canvas.handle(CanvasEvent::PointerMove { pos: pos2(30.0, 30.0), bounds });
        assert!(!canvas.dirty);
        canvas.flush();
        assert!(matches!(canvas.surface.take_damage(), Some(Damage::Region(_))));
        assert_eq!(*canvas.surface.pixels().get_pixel(30, 20), STROKE_COLOR);
    }

    #[test]
    fn missing_bounds_is_a_no_op() {
        let mut canvas = loaded(100, 100);
        canvas.handle(CanvasEvent::PointerDown {
            pos: pos2(10.0, 10.0),
            bounds: None,
        });
        assert!(!canvas.is_drawing());
    }

    #[test]
    fn switching_to_select_cancels_drag() {
        let mut canvas = loaded(100, 100);
        let bounds = at_natural_size(100.0, 100.0);
        canvas.handle(CanvasEvent::PointerDown { pos: pos2(10.0, 10.0), bounds });
        assert!(canvas.is_drawing());
        canvas.set_tool_mode(ToolMode::Select);
        assert!(!canvas.is_drawing());
        let done = canvas.handle(CanvasEvent::PointerUp { pos: pos2(60.0, 60.0), bounds });
        assert_eq!(done, None);
    }

    #[test]
    fn pointer_cancel_drops_candidate_from_surface() {
        let mut canvas = loaded(100, 100);
        let bounds = at_natural_size(100.0, 100.0);
        canvas.handle(CanvasEvent::PointerDown { pos: pos2(10.0, 10.0), bounds });
        canvas.handle(CanvasEvent::PointerMove { pos: pos2(60.0, 60.0), bounds });
        assert_eq!(*canvas.surface().pixels().get_pixel(10, 30), STROKE_COLOR);
        canvas.handle(CanvasEvent::PointerCancel);
        assert_ne!(*canvas.surface().pixels().get_pixel(10, 30), STROKE_COLOR);
    }

    #[test]
    fn failed_load_leaves_surface_blank() {
        let mut canvas = AnnotationCanvas::default();
        let generation = canvas.begin_image("mem://broken");
        canvas.handle(CanvasEvent::ImageLoaded(LoadCompletion {
            generation,
            url: "mem://broken".to_owned(),
            result: Err("bad header".to_owned()),
        }));
        assert!(canvas.surface().is_blank());
        assert!(matches!(canvas.status(), LoadStatus::Failed { message, .. } if message == "bad header"));
    }

    #[test]
    fn unchanged_annotations_do_not_repaint() {
        let mut canvas = loaded(20, 20);
        let list = vec![Annotation {
            id: "1".to_owned(),
            x: 2.0,
            y: 2.0,
            width: 10.0,
            height: 10.0,
            tag: Tag {
                id: "t".to_owned(),
                name: "n".to_owned(),
            },
        }];
        canvas.set_annotations(&list);
        let revision = canvas.surface().revision();
        canvas.set_annotations(&list);
        assert_eq!(canvas.surface().revision(), revision);
    }
}
