//! Cover-fit compositing and PNG encode/decode.
//!
//! The raw raster coming out of the staging pipeline is treated as an
//! intermediate: the final artifact is always composited onto a fresh canvas
//! of exactly the target size, so a few pixels of floating-point drift during
//! staging or rasterization can never change the delivered aspect ratio.

use std::io::Cursor;

use image::{GenericImageView, Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::node::WHITE;

/// Composite `raw` onto a white canvas of exactly `target_w` x `target_h`
/// using cover semantics: scale uniformly by `max(tw/rw, th/rh)`, center,
/// crop overflow. The output never letterboxes.
pub fn cover_fit(raw: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        return Err(Error::Capture("cover-fit target has zero size".into()));
    }
    if raw.width() == 0 || raw.height() == 0 {
        return Err(Error::Capture("cover-fit source has zero size".into()));
    }

    let scale = f64::max(
        target_w as f64 / raw.width() as f64,
        target_h as f64 / raw.height() as f64,
    );
    let dest_w = raw.width() as f64 * scale;
    let dest_h = raw.height() as f64 * scale;
    let offset_x = (target_w as f64 - dest_w) / 2.0;
    let offset_y = (target_h as f64 - dest_h) / 2.0;

    let mut canvas = RgbaImage::from_pixel(target_w, target_h, Rgba(WHITE));
    for py in 0..target_h {
        for px in 0..target_w {
            // Inverse-map each target pixel into the source; pixels whose
            // preimage falls outside are cropped overflow on the other axis
            // and cannot occur, but clamp regardless.
            let sx = ((px as f64 - offset_x) / scale) as i64;
            let sy = ((py as f64 - offset_y) / scale) as i64;
            let sx = sx.clamp(0, raw.width() as i64 - 1) as u32;
            let sy = sy.clamp(0, raw.height() as i64 - 1) as u32;
            canvas.put_pixel(px, py, *raw.get_pixel(sx, sy));
        }
    }
    Ok(canvas)
}

/// Encode pixels as a lossless PNG byte buffer.
pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(pixels.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Error::Capture(format!("PNG encoding failed: {}", e)))?;
    Ok(buf)
}

/// Decode an encoded image just far enough to learn its pixel dimensions.
pub fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::Capture(format!("image decode failed: {}", e)))?;
    Ok(decoded.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        })
    }

    #[test]
    fn output_is_exactly_target_size() {
        for (rw, rh) in [(100, 200), (101, 199), (40, 300), (500, 100)] {
            let out = cover_fit(&checker(rw, rh), 120, 240).expect("cover");
            assert_eq!((out.width(), out.height()), (120, 240));
        }
    }

    #[test]
    fn matching_ratio_maps_edge_to_edge() {
        let mut raw = RgbaImage::from_pixel(100, 200, Rgba([0, 128, 0, 255]));
        raw.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        let out = cover_fit(&raw, 200, 400).expect("cover");
        // Top-left source pixel covers the top-left 2x2 of the target
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [1, 2, 3, 255]);
        assert_eq!(out.get_pixel(2, 2).0, [0, 128, 0, 255]);
    }

    #[test]
    fn wide_source_is_center_cropped() {
        // Left half blue, right half green, target is a tall box: the crop
        // must take the horizontal center, so both colors survive.
        let raw = RgbaImage::from_fn(400, 100, |x, _| {
            if x < 200 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        let out = cover_fit(&raw, 100, 200).expect("cover");
        assert_eq!(out.get_pixel(0, 100).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(99, 100).0, [0, 255, 0, 255]);
    }

    #[test]
    fn zero_sizes_are_capture_errors() {
        let raw = checker(10, 10);
        assert!(cover_fit(&raw, 0, 10).is_err());
        let empty = RgbaImage::new(0, 0);
        assert!(cover_fit(&empty, 10, 10).is_err());
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let png = encode_png(&checker(33, 66)).expect("encode");
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode_dimensions(&png).expect("decode"), (33, 66));
    }
}
