use std::time::Duration;

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions};

use crate::controller::Controller;
use crate::controls::Control;
use crate::export::Delivery;
use crate::log_err;
use crate::surface::Surface;

/// How often to wake up while a file chooser or read is outstanding.
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ScratchApp {
    controller: Controller,
    background_tex: Option<TextureHandle>,
    cover_tex: Option<TextureHandle>,
    background_dirty: bool,
    cover_dirty: bool,
    /// Last thing worth telling the user (export path, upload failure).
    status: Option<String>,
}

impl ScratchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, controller: Controller) -> Self {
        Self {
            controller,
            background_tex: None,
            cover_tex: None,
            background_dirty: true,
            cover_dirty: true,
            status: None,
        }
    }

    fn press(&mut self, control: Control) {
        if let Err(e) = self.controller.click(control.name()) {
            log_err!("'{}' failed: {}", control.name(), e);
            self.status = Some(e.to_string());
        } else if control == Control::Save {
            self.status = match self.controller.last_delivery() {
                Some(Delivery::Written(path)) => Some(format!("Saved {}", path.display())),
                _ => None,
            };
        }
        self.background_dirty = true;
        self.cover_dirty = true;
    }

    fn poll_uploads(&mut self, ctx: &egui::Context) {
        let before = self.controller.uploads_in_flight();
        let errors = self.controller.poll_uploads();
        if self.controller.uploads_in_flight() != before {
            self.background_dirty = true;
            self.cover_dirty = true;
        }
        if let Some(e) = errors.last() {
            self.status = Some(e.to_string());
        }
        if self.controller.uploads_in_flight() > 0 {
            ctx.request_repaint_after(UPLOAD_POLL_INTERVAL);
        }
    }

    fn refresh_textures(&mut self, ctx: &egui::Context) {
        if self.background_dirty {
            upload_texture(
                ctx,
                &mut self.background_tex,
                "background",
                self.controller.background().surface(),
            );
            self.background_dirty = false;
        }
        if self.cover_dirty {
            upload_texture(
                ctx,
                &mut self.cover_tex,
                "cover",
                self.controller.scratch().surface(),
            );
            self.cover_dirty = false;
        }
    }

    /// Largest rect with the surface's aspect ratio, centered in `avail`.
    fn canvas_rect(&self, avail: Rect) -> Rect {
        let s = self.controller.settings();
        let (w, h) = (s.width as f32, s.height as f32);
        let scale = (avail.width() / w).min(avail.height() / h).max(0.01);
        Rect::from_center_size(avail.center(), egui::vec2(w * scale, h * scale))
    }

    fn to_surface(&self, rect: Rect, pos: Pos2) -> (f32, f32) {
        let s = self.controller.settings();
        let (w, h) = (s.width as f32, s.height as f32);
        (
            (pos.x - rect.min.x) / rect.width() * w,
            (pos.y - rect.min.y) / rect.height() * h,
        )
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, rect: Rect, hovered: bool) {
        let (pressed, down, released, pos) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });

        if pressed
            && hovered
            && let Some(p) = pos
        {
            let (x, y) = self.to_surface(rect, p);
            self.controller.pointer_down(x, y);
            self.cover_dirty = true;
        } else if down
            && self.controller.scratch().is_stroke_active()
            && let Some(p) = pos
        {
            let (x, y) = self.to_surface(rect, p);
            self.controller.pointer_move(x, y);
            self.cover_dirty = true;
        }

        // Release ends the stroke even outside the canvas
        if released && self.controller.scratch().is_stroke_active() {
            self.controller.pointer_up();
        }
    }
}

fn upload_texture(
    ctx: &egui::Context,
    slot: &mut Option<TextureHandle>,
    name: &str,
    surface: &Surface,
) {
    let image = surface.to_color_image();
    match slot {
        Some(tex) => tex.set(image, TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, image, TextureOptions::LINEAR)),
    }
}

impl eframe::App for ScratchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_uploads(ctx);

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let in_flight = self.controller.uploads_in_flight();
                if in_flight > 0 {
                    ui.spinner();
                    ui.label(format!("Waiting for {} upload(s)", in_flight));
                } else if let Some(msg) = &self.status {
                    ui.label(msg);
                } else {
                    ui.label("Scratch to reveal the rainbow");
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_gray(24)))
            .show(ctx, |ui| {
                let rect = self.canvas_rect(ui.available_rect_before_wrap());
                let response = ui.allocate_rect(rect, Sense::drag());
                self.handle_pointer(ui.ctx(), rect, response.hovered());
                self.refresh_textures(ui.ctx());

                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                // Background first, cover on top
                for tex in [&self.background_tex, &self.cover_tex].into_iter().flatten() {
                    ui.painter().image(tex.id(), rect, uv, Color32::WHITE);
                }
            });

        if self.controller.menu().is_visible() {
            let mut clicked = None;
            egui::Area::new("menu")
                .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 8.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        clicked = self.controller.menu().ui(ui);
                    });
                });
            if let Some(control) = clicked {
                self.press(control);
            }
        }
    }
}
