// ============================================================================
// SURFACE — fixed-size RGBA pixel buffer shared by both layers
// ============================================================================

use eframe::egui;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use rayon::prelude::*;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An owned drawable with fixed width and height.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, color),
        }
    }

    /// Scale `image` so it covers `width`×`height`, cropping the overflow
    /// around the center. Same-size images are copied untouched.
    pub fn fit(image: &DynamicImage, width: u32, height: u32) -> Self {
        let pixels = if image.width() == width && image.height() == height {
            image.to_rgba8()
        } else {
            image
                .resize_to_fill(width, height, FilterType::Triangle)
                .to_rgba8()
        };
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Paint `src` over this surface with its top-left corner at (`x`, `y`),
    /// using normal source-over blending. Pixels outside either surface are skipped.
    pub fn draw_surface(&mut self, src: &Surface, x: i32, y: i32) {
        let (dw, dh) = self.dimensions();
        let (sw, sh) = src.dimensions();

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + sw as i32).min(dw as i32);
        let y1 = (y + sh as i32).min(dh as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let row_bytes = dw as usize * 4;
        let src_img = &src.pixels;
        let dst: &mut [u8] = &mut self.pixels;

        // Rows are independent, so blend them in parallel
        dst.par_chunks_mut(row_bytes)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(dy, row)| {
                let sy = (dy as i32 - y) as u32;
                for dx in x0..x1 {
                    let sx = (dx - x) as u32;
                    let top = *src_img.get_pixel(sx, sy);
                    let i = dx as usize * 4;
                    let base = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                    let out = blend_over(base, top);
                    row[i..i + 4].copy_from_slice(&out.0);
                }
            });
    }

    /// Upload-ready copy for an egui texture.
    pub fn to_color_image(&self) -> egui::ColorImage {
        let (w, h) = self.dimensions();
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], self.pixels.as_raw())
    }
}

/// Normal ("source-over") blend of `top` onto `base`, straight alpha.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    // Fast paths: nothing to add, or a full overwrite
    if top[3] == 0 {
        return base;
    }
    if top[3] == 255 || base[3] == 0 {
        return top;
    }

    let top_a = top[3] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);

    let channel = |b: u8, t: u8| -> u8 {
        let b = b as f32 / 255.0;
        let t = t as f32 / 255.0;
        let c = (t * top_a + b * base_a * (1.0 - top_a)) / out_a;
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(base[0], top[0]),
        channel(base[1], top[1]),
        channel(base[2], top[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_top_overwrites_and_transparent_top_keeps_base() {
        let base = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(base, Rgba([1, 2, 3, 255])), Rgba([1, 2, 3, 255]));
        assert_eq!(blend_over(base, TRANSPARENT), base);
    }

    #[test]
    fn half_alpha_over_opaque_mixes_evenly() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]));
    }

    #[test]
    fn draw_surface_clips_to_destination() {
        let mut dst = Surface::filled(4, 4, Rgba([0, 0, 0, 255]));
        let src = Surface::filled(3, 3, Rgba([255, 0, 0, 255]));
        dst.draw_surface(&src, 2, 2);

        assert_eq!(dst.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(dst.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(dst.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn draw_surface_with_negative_offset() {
        let mut dst = Surface::new(2, 2);
        let mut src = Surface::new(3, 3);
        src.pixels_mut().put_pixel(2, 2, Rgba([9, 9, 9, 255]));
        dst.draw_surface(&src, -1, -1);

        assert_eq!(dst.get_pixel(1, 1), Rgba([9, 9, 9, 255]));
        assert_eq!(dst.get_pixel(0, 0), TRANSPARENT);
    }

    #[test]
    fn fit_normalizes_any_size() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 10, Rgba([5, 6, 7, 255])));
        let fitted = Surface::fit(&wide, 16, 16);
        assert_eq!(fitted.dimensions(), (16, 16));
        assert_eq!(fitted.get_pixel(8, 8), Rgba([5, 6, 7, 255]));
    }

    #[test]
    fn fit_same_size_is_lossless() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(1, 1, Rgba([200, 100, 50, 77]));
        let fitted = Surface::fit(&DynamicImage::ImageRgba8(img.clone()), 3, 2);
        assert_eq!(fitted.pixels(), &img);
    }
}
