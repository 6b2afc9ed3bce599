/// Rasterizer: executes paint commands into an RGBA pixel grid.
///
/// All command coordinates are in display pixels; the export scale is applied
/// here, at draw time, so the same layout serves any target resolution. Text
/// is drawn with a packed 5x7 face, images with a nearest-neighbour stretch
/// blit clipped to the canvas.
use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::node::{Color, WHITE};
use crate::rendering::layout::{self, LINE_HEIGHT};
use crate::rendering::paint::{self, PaintCommand, STAR_EMPTY, STAR_FILL};
use crate::surface::Staged;

/// Rasterize a staged capture copy at the given display-to-export scale.
///
/// The output pixel size is the staged box scaled uniformly; content that
/// overflows the forced box is clipped, never resized.
pub fn rasterize(staged: &Staged, scale: f64) -> Result<RgbaImage> {
    if staged.width == 0 || staged.height == 0 {
        return Err(Error::Capture("staged capture has zero rendered size".into()));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::Capture(format!("invalid rasterization scale {}", scale)));
    }

    let out_w = (staged.width as f64 * scale).round().max(1.0) as u32;
    let out_h = (staged.height as f64 * scale).round().max(1.0) as u32;

    let nodes = layout::layout_tree(&staged.root, staged.width);
    let commands = paint::build_commands(&nodes);
    log::debug!(
        "rasterizing staged copy: {} commands into {}x{} (scale {:.3})",
        commands.len(),
        out_w,
        out_h,
        scale
    );

    let mut canvas = RgbaImage::from_pixel(out_w, out_h, Rgba(WHITE));
    for command in &commands {
        match command {
            PaintCommand::SolidRect { rect, color } => {
                fill_display_rect(
                    &mut canvas,
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                    scale,
                    *color,
                );
            }
            PaintCommand::Blit { rect, image } => {
                blit(&mut canvas, rect, image.pixels(), scale);
            }
            PaintCommand::Glyphs {
                x,
                y,
                text,
                scale: text_scale,
                color,
            } => {
                draw_text(&mut canvas, *x, *y, text, *text_scale, scale, *color);
            }
            PaintCommand::Stars { rect, rating } => {
                draw_stars(&mut canvas, rect, *rating, scale);
            }
        }
    }

    Ok(canvas)
}

/// Fill a display-space rectangle, rounding its edges to device pixels and
/// clipping to the canvas.
fn fill_display_rect(
    canvas: &mut RgbaImage,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    scale: f64,
    color: Color,
) {
    let x0 = (x * scale).round() as i64;
    let y0 = (y * scale).round() as i64;
    let x1 = ((x + w) * scale).round() as i64;
    let y1 = ((y + h) * scale).round() as i64;
    fill_device_rect(canvas, x0, y0, x1, y1, color);
}

fn fill_device_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
    let cw = canvas.width() as i64;
    let ch = canvas.height() as i64;
    let x0 = x0.clamp(0, cw);
    let y0 = y0.clamp(0, ch);
    let x1 = x1.clamp(0, cw);
    let y1 = y1.clamp(0, ch);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px as u32, py as u32, Rgba(color));
        }
    }
}

/// Nearest-neighbour stretch blit of `src` into the display rect.
fn blit(canvas: &mut RgbaImage, rect: &layout::Rect, src: &RgbaImage, scale: f64) {
    if src.width() == 0 || src.height() == 0 {
        return;
    }
    let x0 = (rect.x as f64 * scale).round() as i64;
    let y0 = (rect.y as f64 * scale).round() as i64;
    let x1 = ((rect.x as f64 + rect.width as f64) * scale).round() as i64;
    let y1 = ((rect.y as f64 + rect.height as f64) * scale).round() as i64;
    let dest_w = (x1 - x0).max(0) as f64;
    let dest_h = (y1 - y0).max(0) as f64;
    if dest_w == 0.0 || dest_h == 0.0 {
        return;
    }

    let cw = canvas.width() as i64;
    let ch = canvas.height() as i64;
    for py in y0.clamp(0, ch)..y1.clamp(0, ch) {
        for px in x0.clamp(0, cw)..x1.clamp(0, cw) {
            let u = ((px - x0) as f64 / dest_w * src.width() as f64) as u32;
            let v = ((py - y0) as f64 / dest_h * src.height() as f64) as u32;
            let pixel = *src.get_pixel(u.min(src.width() - 1), v.min(src.height() - 1));
            canvas.put_pixel(px as u32, py as u32, pixel);
        }
    }
}

fn draw_text(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    text: &str,
    text_scale: u32,
    scale: f64,
    color: Color,
) {
    let cell = text_scale.max(1) as f64;
    for (line_index, line) in text.lines().enumerate() {
        let pen_y = y as f64 + (line_index as u32 * LINE_HEIGHT * text_scale) as f64;
        for (col_index, ch) in line.chars().enumerate() {
            let pen_x = x as f64 + (col_index as u32 * layout::GLYPH_ADVANCE * text_scale) as f64;
            let rows = glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..layout::GLYPH_WIDTH {
                    if bits & (1 << (layout::GLYPH_WIDTH - 1 - col)) != 0 {
                        fill_display_rect(
                            canvas,
                            pen_x + col as f64 * cell,
                            pen_y + row as f64 * cell,
                            cell,
                            cell,
                            scale,
                            color,
                        );
                    }
                }
            }
        }
    }
}

/// 7x7 star cell bitmap
const STAR: [u8; 7] = [
    0b0001000, 0b0011100, 0b1111111, 0b0111110, 0b0011100, 0b0110110, 0b0100010,
];

fn draw_stars(canvas: &mut RgbaImage, rect: &layout::Rect, rating: f32, scale: f64) {
    let cell = rect.height as f64 / 7.0;
    let star_w = rect.height as f64;
    let gap = 2.0;
    for star in 0..5 {
        let fraction = (rating - star as f32).clamp(0.0, 1.0);
        let filled_cols = (fraction * 7.0).round() as u32;
        let origin_x = rect.x as f64 + star as f64 * (star_w + gap);
        for (row, bits) in STAR.iter().enumerate() {
            for col in 0..7u32 {
                if bits & (1 << (6 - col)) != 0 {
                    let color = if col < filled_cols { STAR_FILL } else { STAR_EMPTY };
                    fill_display_rect(
                        canvas,
                        origin_x + col as f64 * cell,
                        rect.y as f64 + row as f64 * cell,
                        cell,
                        cell,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// Packed 5x7 face: each glyph is seven rows of five bits, MSB on the left.
/// Lowercase folds to uppercase; anything unmapped renders as a hollow box.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        ' ' => [0; 7],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b11110, 0b10001, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00100, 0b01000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '\'' => [0b00100, 0b00100, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '"' => [0b01010, 0b01010, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '@' => [0b01110, 0b10001, 0b10111, 0b10101, 0b10111, 0b10000, 0b01110],
        '+' => [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000],
        '*' => [0b00000, 0b10101, 0b01110, 0b11111, 0b01110, 0b10101, 0b00000],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}
