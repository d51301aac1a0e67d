//! Thin raster surface over the `image` crate. The compositor speaks only
//! this vocabulary, so the imaging backend never leaks into its logic.

use image::codecs::png::PngEncoder;
use image::{Rgba, RgbaImage};

/// Fresh opaque-white canvas, the background the sector tiles land on.
pub fn new_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0xff; 4]))
}

/// Copies `src` onto `dst` at `(x, y)`, replacing pixels. Clipped to `dst`.
pub fn paste(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    image::imageops::replace(dst, src, x, y);
}

/// Source-over composite of `src` onto `dst` at `(x, y)`. Clipped to `dst`.
pub fn alpha_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    image::imageops::overlay(dst, src, x, y);
}

/// Linear blend of a solid color into the `size`×`size` square at `(x, y)`:
/// `out = dst + (color − dst) · factor` per channel, alpha blending toward
/// opaque. Pixels outside `dst` are ignored.
pub fn blend_rect(dst: &mut RgbaImage, x: i64, y: i64, size: u32, color: [u8; 3], factor: f32) {
    let (width, height) = (i64::from(dst.width()), i64::from(dst.height()));
    for oy in 0..i64::from(size) {
        for ox in 0..i64::from(size) {
            let (dx, dy) = (x + ox, y + oy);
            if dx < 0 || dy < 0 || dx >= width || dy >= height {
                continue;
            }
            let px = dst.get_pixel_mut(dx as u32, dy as u32);
            for channel in 0..3 {
                px.0[channel] = lerp(px.0[channel], color[channel], factor);
            }
            px.0[3] = lerp(px.0[3], 0xff, factor);
        }
    }
}

/// Upscales by exact pixel replication: every source pixel becomes a
/// `zoom`×`zoom` block. Overlay placement assumes these exact block
/// boundaries; a smoothing resize would blur them.
pub fn scale_integer(src: &RgbaImage, zoom: u32) -> RgbaImage {
    debug_assert!(zoom >= 1);
    let mut out = RgbaImage::new(src.width() * zoom, src.height() * zoom);
    for (x, y, px) in src.enumerate_pixels() {
        for oy in 0..zoom {
            for ox in 0..zoom {
                out.put_pixel(x * zoom + ox, y * zoom + oy, *px);
            }
        }
    }
    out
}

/// Nearest-neighbor resample to an arbitrary target size.
pub fn scale_nearest(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    image::imageops::resize(src, width, height, image::imageops::FilterType::Nearest)
}

/// Scales every pixel's alpha by `factor`, fading the image toward
/// transparency.
pub fn fade_alpha(img: &mut RgbaImage, factor: f32) {
    for px in img.pixels_mut() {
        px.0[3] = (f32::from(px.0[3]) * factor).round() as u8;
    }
}

/// Draws a `width`-pixel ring just inside the circle inscribed in the
/// `diameter`×`diameter` box whose top-left corner is `(x, y)`.
pub fn draw_ring(dst: &mut RgbaImage, x: i64, y: i64, diameter: u32, width: u32, color: [u8; 4]) {
    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    let r_outer = f64::from(diameter) / 2.0;
    let r_inner = (r_outer - f64::from(width)).max(0.0);
    let center = r_outer - 0.5;
    for oy in 0..diameter {
        for ox in 0..diameter {
            let dist_x = f64::from(ox) - center;
            let dist_y = f64::from(oy) - center;
            let dist = (dist_x * dist_x + dist_y * dist_y).sqrt();
            if dist > r_outer || dist < r_inner {
                continue;
            }
            let (dx, dy) = (x + i64::from(ox), y + i64::from(oy));
            if dx < 0 || dy < 0 || dx >= dst_w || dy >= dst_h {
                continue;
            }
            dst.put_pixel(dx as u32, dy as u32, Rgba(color));
        }
    }
}

/// PNG-encodes in memory. Callers persist the buffer with a single write so
/// no partial file is ever observable on disk.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_with_encoder(PngEncoder::new(&mut buf))?;
    Ok(buf)
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
}
