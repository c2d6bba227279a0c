// ============================================================================
// SCRATCH-OFF COVER — the opaque top layer the user scratches away
// ============================================================================

use image::Rgba;

use crate::ingest::ImagePayload;
use crate::surface::{Surface, TRANSPARENT};

/// Default cover colour.
pub const COVER_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Reported stroke boundaries, drained by whoever owns the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeEvent {
    Started,
    Ended,
}

pub struct ScratchOff {
    /// What a full reset restores (black, or an adopted upload).
    cover_art: Surface,
    /// The live cover with scratched-out holes.
    surface: Surface,
    /// Stroke width in pixels.
    brush_size: u32,
    /// When true, strokes paint cover art back instead of scratching it off.
    erasing: bool,
    /// Last pointer position while a stroke is in progress.
    stroke_last: Option<(f32, f32)>,
    events: Vec<StrokeEvent>,
}

impl ScratchOff {
    pub fn new(width: u32, height: u32) -> Self {
        let cover_art = Surface::filled(width, height, COVER_COLOR);
        Self {
            surface: cover_art.clone(),
            cover_art,
            brush_size: 1,
            erasing: false,
            stroke_last: None,
            events: Vec::new(),
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.max(1);
    }

    pub fn toggle_erase_mode(&mut self) {
        self.erasing = !self.erasing;
    }

    pub fn is_erasing(&self) -> bool {
        self.erasing
    }

    /// Restore the full opaque cover.
    pub fn reset(&mut self) {
        self.surface = self.cover_art.clone();
    }

    /// Use an uploaded image as the cover, normalized to the surface size.
    pub fn adopt_image(&mut self, payload: &ImagePayload) {
        let (w, h) = self.surface.dimensions();
        self.cover_art = Surface::fit(payload.image(), w, h);
        self.reset();
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke_last.is_some()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.stroke_last.is_some() {
            // A second press without release continues the current stroke
            self.pointer_move(x, y);
            return;
        }
        self.events.push(StrokeEvent::Started);
        self.stroke_last = Some((x, y));
        self.stamp_segment((x, y), (x, y));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(last) = self.stroke_last {
            self.stamp_segment(last, (x, y));
            self.stroke_last = Some((x, y));
        }
    }

    /// Ends the stroke wherever the pointer is, including outside the surface.
    pub fn pointer_up(&mut self) {
        if self.stroke_last.take().is_some() {
            self.events.push(StrokeEvent::Ended);
        }
    }

    pub fn take_stroke_events(&mut self) -> Vec<StrokeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply a round brush along `a`→`b`.
    fn stamp_segment(&mut self, a: (f32, f32), b: (f32, f32)) {
        // Brush is centred on the pixel under the pointer, so a size-1 brush
        // always clears exactly that pixel
        let (a, b) = (pixel_center(a), pixel_center(b));
        let radius = self.brush_size as f32 / 2.0;
        let (w, h) = self.surface.dimensions();

        let min_x = (a.0.min(b.0) - radius).floor().max(0.0) as u32;
        let min_y = (a.1.min(b.1) - radius).floor().max(0.0) as u32;
        let max_x = ((a.0.max(b.0) + radius).ceil().max(0.0) as u32).min(w);
        let max_y = ((a.1.max(b.1) + radius).ceil().max(0.0) as u32).min(h);

        for py in min_y..max_y {
            for px in min_x..max_x {
                let center = (px as f32 + 0.5, py as f32 + 0.5);
                if distance_to_segment(center, a, b) > radius {
                    continue;
                }
                let value = if self.erasing {
                    self.cover_art.get_pixel(px, py)
                } else {
                    TRANSPARENT
                };
                self.surface.pixels_mut().put_pixel(px, py, value);
            }
        }
    }
}

fn pixel_center(p: (f32, f32)) -> (f32, f32) {
    (p.0.floor() + 0.5, p.1.floor() + 0.5)
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}
