// ============================================================================
// BACKGROUND — procedurally generated rainbow revealed under the cover
// ============================================================================

use image::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::ingest::ImagePayload;
use crate::surface::Surface;

/// Random parameters for one rainbow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RainbowParams {
    /// Direction the hue bands run along, radians.
    pub angle: f32,
    /// Full hue cycles across the surface diagonal.
    pub cycles: f32,
    /// Hue offset in [0, 1).
    pub phase: f32,
    pub saturation: f32,
    /// Center of the brightness swell, in unit coordinates.
    pub swell: (f32, f32),
}

impl RainbowParams {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            angle: rng.gen_range(0.0..std::f32::consts::TAU),
            cycles: rng.gen_range(0.6..2.5),
            phase: rng.gen_range(0.0..1.0),
            saturation: rng.gen_range(0.8..1.0),
            swell: (rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)),
        }
    }
}

pub struct Background {
    surface: Surface,
    last_params: Option<RainbowParams>,
}

impl Background {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Surface::new(width, height),
            last_params: None,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Parameters of the current rainbow, `None` after an upload.
    pub fn params(&self) -> Option<RainbowParams> {
        self.last_params
    }

    /// Paint a fresh random rainbow.
    pub fn generate(&mut self) {
        let params = RainbowParams::random(&mut rand::thread_rng());
        self.paint(params);
    }

    /// Same as `generate`, reproducible for a given seed.
    pub fn generate_with_seed(&mut self, seed: u64) {
        let params = RainbowParams::random(&mut StdRng::seed_from_u64(seed));
        self.paint(params);
    }

    /// Use an uploaded image, normalized to the surface size.
    pub fn adopt_image(&mut self, payload: &ImagePayload) {
        let (w, h) = self.surface.dimensions();
        self.surface = Surface::fit(payload.image(), w, h);
        self.last_params = None;
    }

    pub fn paint(&mut self, params: RainbowParams) {
        let (w, h) = self.surface.dimensions();
        let (dir_x, dir_y) = (params.angle.cos(), params.angle.sin());
        let diagonal = ((w as f32).powi(2) + (h as f32).powi(2)).sqrt().max(1.0);
        let row_bytes = w as usize * 4;

        let buf: &mut [u8] = self.surface.pixels_mut();
        buf.par_chunks_mut(row_bytes.max(4))
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..w as usize {
                    let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
                    let along = (fx * dir_x + fy * dir_y) / diagonal;
                    let hue = (along * params.cycles + params.phase).rem_euclid(1.0);

                    let (ux, uy) = (fx / w as f32, fy / h.max(1) as f32);
                    let d = ((ux - params.swell.0).powi(2) + (uy - params.swell.1).powi(2)).sqrt();
                    let value = (1.0 - 0.35 * d).clamp(0.55, 1.0);

                    let px = hsv_to_rgba(hue, params.saturation, value);
                    row[x * 4..x * 4 + 4].copy_from_slice(&px.0);
                }
            });

        self.last_params = Some(params);
    }
}

/// `h`, `s`, `v` in [0, 1]. Always opaque.
pub fn hsv_to_rgba(h: f32, s: f32, v: f32) -> Rgba<u8> {
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let sector = h6.floor() as u32 % 6;
    let f = h6 - h6.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(hsv_to_rgba(0.0, 1.0, 1.0), Rgba([255, 0, 0, 255]));
        assert_eq!(hsv_to_rgba(1.0 / 3.0, 1.0, 1.0), Rgba([0, 255, 0, 255]));
        assert_eq!(hsv_to_rgba(2.0 / 3.0, 1.0, 1.0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn generated_background_is_opaque() {
        let mut bg = Background::new(24, 16);
        bg.generate();
        assert!(bg.surface().pixels().pixels().all(|p| p[3] == 255));
        assert!(bg.params().is_some());
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let mut a = Background::new(20, 20);
        let mut b = Background::new(20, 20);
        a.generate_with_seed(7);
        b.generate_with_seed(7);
        assert_eq!(a.surface(), b.surface());

        b.generate_with_seed(8);
        assert_ne!(a.surface(), b.surface());
    }
}
