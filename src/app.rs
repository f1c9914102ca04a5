use eframe::egui;

use crate::canvas::AnnotationCanvas;
use crate::loader::{ImageLoader, LoadStatus};
use crate::model::{BoxRect, Tag, ToolMode};
use crate::store::Project;

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotateApp {
    project: Project,
    canvas: AnnotationCanvas,
    tool: ToolMode,

    selected_tag: Option<Tag>,
    new_tag_buf: String,

    // last error or notice shown in the toolbar
    message: Option<String>,
}

impl AnnotateApp {
    pub fn new(cc: &eframe::CreationContext<'_>, project: Project, tool: ToolMode) -> Self {
        let loader = ImageLoader::new().with_repaint(cc.egui_ctx.clone());
        let selected_tag = project.tags().first().cloned();
        Self {
            project,
            canvas: AnnotationCanvas::new(loader),
            tool,
            selected_tag,
            new_tag_buf: String::new(),
            message: None,
        }
    }

    fn image_url(&self) -> String {
        self.project.current_image().display().to_string()
    }

    fn on_box_drawn(&mut self, rect: BoxRect) {
        let Some(tag) = self.selected_tag.clone() else {
            log::warn!("box drawn with no tag selected, dropping it");
            self.message = Some("Select or add a tag before drawing".to_owned());
            return;
        };
        match self.project.add_annotation(rect, &tag) {
            Ok(ann) => {
                log::info!("added {} ({}) on {}", ann.id, tag.name, self.image_url());
                self.message = None;
            }
            Err(e) => {
                log::error!("failed to save annotation: {e:#}");
                self.message = Some(format!("Failed to save annotation: {e}"));
            }
        }
    }

    fn delete_annotation(&mut self, id: &str) {
        if let Err(e) = self.project.delete_annotation(id) {
            log::error!("failed to delete annotation {id}: {e:#}");
            self.message = Some(format!("Failed to delete annotation: {e}"));
        }
    }

    fn add_tag(&mut self) {
        if let Some(tag) = self.project.add_tag(&self.new_tag_buf) {
            if let Err(e) = self.project.save() {
                log::warn!("failed to persist tags: {e:#}");
            }
            self.selected_tag = Some(tag);
            self.new_tag_buf.clear();
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn pick_image(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
            .pick_file()
        {
            self.project.open_image(path);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tool, ToolMode::Select, ToolMode::Select.label());
            ui.selectable_value(&mut self.tool, ToolMode::Box, ToolMode::Box.label());
            ui.separator();

            if ui.button("◀").on_hover_text("Previous image").clicked() {
                self.project.prev();
            }
            let (pos, total) = self.project.position();
            ui.label(format!("Image {pos} of {total}"));
            if ui.button("▶").on_hover_text("Next image").clicked() {
                self.project.next();
            }

            #[cfg(not(target_arch = "wasm32"))]
            {
                ui.separator();
                if ui.button("Open image…").clicked() {
                    self.pick_image();
                }
            }

            ui.separator();
            match self.canvas.status() {
                LoadStatus::Failed { message, .. } => {
                    ui.colored_label(egui::Color32::RED, message.as_str());
                }
                _ => {
                    if let Some(msg) = &self.message {
                        ui.colored_label(egui::Color32::YELLOW, msg.as_str());
                    }
                }
            }
        });
    }

    fn sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tags");
        for tag in self.project.tags() {
            let selected = self.selected_tag.as_ref().is_some_and(|t| t.name == tag.name);
            if ui.selectable_label(selected, tag.name.as_str()).clicked() {
                self.selected_tag = Some(tag.clone());
            }
        }
        ui.horizontal(|ui| {
            let edit = ui.add(egui::TextEdit::singleline(&mut self.new_tag_buf).hint_text("New tag"));
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || submitted {
                self.add_tag();
            }
        });

        ui.separator();
        ui.heading("Annotations");
        let mut to_delete = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            if self.project.annotations().is_empty() {
                ui.weak("None yet");
            }
            for ann in self.project.annotations() {
                ui.horizontal(|ui| {
                    ui.label(ann.tag.name.as_str());
                    ui.weak(format!(
                        "{:.0},{:.0} {:.0}×{:.0}",
                        ann.x, ann.y, ann.width, ann.height
                    ));
                    if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                        to_delete = Some(ann.id.clone());
                    }
                });
            }
        });
        if let Some(id) = to_delete {
            self.delete_annotation(&id);
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keyboard shortcuts
        if !ctx.wants_keyboard_input() {
            let (box_tool, select_tool, next, prev) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::B),
                    i.key_pressed(egui::Key::V),
                    i.key_pressed(egui::Key::ArrowRight),
                    i.key_pressed(egui::Key::ArrowLeft),
                )
            });
            if box_tool {
                self.tool = ToolMode::Box;
            }
            if select_tool {
                self.tool = ToolMode::Select;
            }
            if next {
                self.project.next();
            }
            if prev {
                self.project.prev();
            }
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::SidePanel::right("sidebar")
            .default_width(240.0)
            .show(ctx, |ui| self.sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let url = self.image_url();
            self.canvas.set_image_url(&url);
            self.canvas.set_annotations(self.project.annotations());
            self.canvas.set_tool_mode(self.tool);

            let mut drawn = None;
            self.canvas.show(ui, |rect| drawn = Some(rect));
            if let Some(rect) = drawn {
                self.on_box_drawn(rect);
                // feed the new list back in right away
                self.canvas.set_annotations(self.project.annotations());
                ctx.request_repaint();
            }
        });
    }
}
