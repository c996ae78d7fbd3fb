// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Raster helpers shared by the visual passes: blending, thick/dashed lines,
//! arrows, arcs, and font loading.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use image::{GrayImage, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};

use crate::color::Color;

/// Assets URL for downloading fonts
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Blend `overlay` onto `frame` in place: `frame = overlay*alpha + frame*(1-alpha)`.
pub fn blend_weighted(frame: &mut RgbImage, overlay: &RgbImage, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (dst, src) in frame.pixels_mut().zip(overlay.pixels()) {
        for c in 0..3 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let blended = (f32::from(src.0[c]) * alpha + f32::from(dst.0[c]) * (1.0 - alpha))
                .clamp(0.0, 255.0) as u8;
            dst.0[c] = blended;
        }
    }
}

/// Additively composite a colorized, mask-weighted glow onto the frame.
///
/// Each pixel gains `color * (mask/255) * (mask/255 * alpha)`, clamped. The
/// quadratic mask weighting concentrates the glow around the mask core.
pub fn additive_glow(frame: &mut RgbImage, mask: &GrayImage, color: Color, alpha: f32) {
    let channels = [color.0, color.1, color.2];
    for (dst, m) in frame.pixels_mut().zip(mask.pixels()) {
        let level = f32::from(m.0[0]) / 255.0;
        if level <= 0.0 {
            continue;
        }
        let weight = level * alpha.clamp(0.0, 1.0);
        for c in 0..3 {
            let glow = f32::from(channels[c]) * level;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sum = (f32::from(dst.0[c]) + glow * weight).clamp(0.0, 255.0) as u8;
            dst.0[c] = sum;
        }
    }
}

/// Draw a line with the given thickness by offsetting parallel segments.
pub fn draw_thick_line(
    frame: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Color,
    thickness: u32,
) {
    let rgb = color.rgb();
    if thickness <= 1 {
        draw_line_segment_mut(frame, start, end, rgb);
        return;
    }

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = dx.hypot(dy);
    if len < 1e-3 {
        draw_line_segment_mut(frame, start, end, rgb);
        return;
    }
    let nx = -dy / len;
    let ny = dx / len;

    #[allow(clippy::cast_precision_loss)]
    let base = -((thickness - 1) as f32) / 2.0;
    for i in 0..thickness {
        #[allow(clippy::cast_precision_loss)]
        let offset = base + i as f32;
        draw_line_segment_mut(
            frame,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            rgb,
        );
    }
}

/// Draw a thick line on a grayscale mask.
pub fn draw_thick_line_gray(
    mask: &mut GrayImage,
    start: (f32, f32),
    end: (f32, f32),
    level: u8,
    thickness: u32,
) {
    let pixel = image::Luma([level]);
    if thickness <= 1 {
        draw_line_segment_mut(mask, start, end, pixel);
        return;
    }
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = dx.hypot(dy);
    if len < 1e-3 {
        draw_line_segment_mut(mask, start, end, pixel);
        return;
    }
    let nx = -dy / len;
    let ny = dx / len;
    #[allow(clippy::cast_precision_loss)]
    let base = -((thickness - 1) as f32) / 2.0;
    for i in 0..thickness {
        #[allow(clippy::cast_precision_loss)]
        let offset = base + i as f32;
        draw_line_segment_mut(
            mask,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            pixel,
        );
    }
}

/// Draw a dashed line with 8 px dashes.
pub fn draw_dashed_line(
    frame: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Color,
    thickness: u32,
) {
    const DASH_LENGTH: f32 = 8.0;

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = dx.hypot(dy);
    if length < 1.0 {
        return;
    }
    let ux = dx / length;
    let uy = dy / length;

    let mut travelled = 0.0;
    let mut draw_dash = true;
    while travelled < length {
        let segment = DASH_LENGTH.min(length - travelled);
        if draw_dash {
            let seg_start = (start.0 + ux * travelled, start.1 + uy * travelled);
            let seg_end = (
                start.0 + ux * (travelled + segment),
                start.1 + uy * (travelled + segment),
            );
            draw_thick_line(frame, seg_start, seg_end, color, thickness);
        }
        travelled += segment;
        draw_dash = !draw_dash;
    }
}

/// Draw a two-wing arrow head at `end`, pointing away from `start`.
pub fn draw_arrow_head(
    frame: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Color,
    thickness: u32,
) {
    const WING_ANGLE: f32 = 0.5; // radians

    #[allow(clippy::cast_precision_loss)]
    let wing_length = (thickness as f32 * 4.0).max(8.0);

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = dx.hypot(dy);
    if length < 1.0 {
        return;
    }
    let ux = dx / length;
    let uy = dy / length;

    let cos_a = WING_ANGLE.cos();
    let sin_a = WING_ANGLE.sin();

    let left = (
        end.0 + (-ux * cos_a + uy * sin_a) * wing_length,
        end.1 + (-ux * sin_a - uy * cos_a) * wing_length,
    );
    let right = (
        end.0 + (-ux * cos_a - uy * sin_a) * wing_length,
        end.1 + (ux * sin_a - uy * cos_a) * wing_length,
    );

    draw_thick_line(frame, end, left, color, thickness);
    draw_thick_line(frame, end, right, color, thickness);
}

/// Draw a circular arc between two angles (degrees, clockwise from 3 o'clock)
/// as a chain of 5-degree line segments.
pub fn draw_arc(
    frame: &mut RgbImage,
    center: (i32, i32),
    radius: f32,
    start_deg: f32,
    end_deg: f32,
    color: Color,
    thickness: u32,
) {
    let sweep = end_deg - start_deg;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let segments = ((sweep.abs() / 5.0) as usize).max(1);

    #[allow(clippy::cast_precision_loss)]
    let point_at = |deg: f32| -> (f32, f32) {
        let rad = deg.to_radians();
        (
            center.0 as f32 + radius * rad.cos(),
            center.1 as f32 + radius * rad.sin(),
        )
    };

    for i in 0..segments {
        #[allow(clippy::cast_precision_loss)]
        let a1 = start_deg + sweep * i as f32 / segments as f32;
        #[allow(clippy::cast_precision_loss)]
        let a2 = start_deg + sweep * (i + 1) as f32 / segments as f32;
        draw_thick_line(frame, point_at(a1), point_at(a2), color, thickness);
    }
}

/// Gaussian sigma matching OpenCV's kernel-size derivation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Draw text if a font is available and the anchor is inside the frame.
pub fn draw_label(
    frame: &mut RgbImage,
    font: Option<&FontVec>,
    text: &str,
    x: i32,
    y: i32,
    scale: f32,
    color: Color,
) {
    let Some(font) = font else {
        return;
    };
    let (width, height) = frame.dimensions();
    #[allow(clippy::cast_possible_wrap)]
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    draw_text_mut(frame, color.rgb(), x, y, PxScale::from(scale), font, text);
}

/// Check if the font exists locally or download it.
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = std::path::Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join("Ultralytics");
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        crate::warn!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    crate::verbose!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    crate::warn!("Failed to create font file: {e}");
                    return None;
                }
            };
            let mut reader = response.into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                crate::warn!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }
            Some(font_path)
        }
        Err(e) => {
            crate::warn!("Failed to download font from {url}: {e}");
            None
        }
    }
}

/// Load the default HUD font, fetching it on first use. `None` disables all
/// text drawing.
#[must_use]
pub fn load_font() -> Option<FontVec> {
    let path = check_font("Arial.ttf")?;
    let mut file = File::open(path).ok()?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).ok()?;
    FontVec::try_from_vec(buffer).ok()
}
