//! Single-page PDF packaging.
//!
//! The captured raster and the page share the same aspect ratio by
//! construction, so the image is drawn full-bleed: one page of exactly
//! `document_width x document_height` millimetres, no margins, no
//! letterboxing. The writer emits the header, five objects, the xref table
//! and the trailer directly; nothing about a one-image page needs a general
//! PDF object model.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::{Raster, StickerSpec};

const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Page size in points for a spec's document output.
pub fn page_size_pt(spec: &StickerSpec) -> (f64, f64) {
    (
        mm_to_pt(spec.document_width_mm),
        mm_to_pt(spec.document_height_mm),
    )
}

/// Wrap a captured raster into a single-page, full-bleed PDF document.
pub fn write_single_page(raster: &Raster, spec: &StickerSpec) -> Result<Vec<u8>> {
    if spec.document_width_mm <= 0.0 || spec.document_height_mm <= 0.0 {
        return Err(Error::Encoding(format!(
            "unsupported document size {}x{}mm",
            spec.document_width_mm, spec.document_height_mm
        )));
    }

    // The PDF imaging model wants raw samples; alpha is irrelevant here
    // because captures are composited onto an opaque white canvas.
    let rgb = image::load_from_memory(&raster.png_data)
        .map_err(|e| Error::Encoding(format!("raster decode failed: {}", e)))?
        .to_rgb8();
    let (img_w, img_h) = rgb.dimensions();
    if img_w == 0 || img_h == 0 {
        return Err(Error::Encoding("raster has zero size".into()));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .map_err(|e| Error::Encoding(format!("image stream compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Encoding(format!("image stream compression failed: {}", e)))?;

    Ok(assemble(img_w, img_h, &compressed, spec))
}

fn assemble(img_w: u32, img_h: u32, compressed: &[u8], spec: &StickerSpec) -> Vec<u8> {
    let (page_w, page_h) = page_size_pt(spec);

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = [0usize; 5];

    offsets[0] = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets[1] = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets[2] = out.len();
    out.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n",
            page_w, page_h
        )
        .as_bytes(),
    );

    offsets[3] = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode \
             /Length {} >>\nstream\n",
            img_w,
            img_h,
            compressed.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(compressed);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    // Full-bleed: the image transform spans the entire page box.
    let content = format!("q\n{:.2} 0 0 {:.2} 0 0 cm\n/Im0 Do\nQ\n", page_w, page_h);
    offsets[4] = out.len();
    out.extend_from_slice(
        format!(
            "5 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );

    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n%%EOF\n", xref_start).as_bytes());

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn small_raster() -> Raster {
        let pixels = RgbaImage::from_pixel(50, 100, Rgba([40, 60, 80, 255]));
        let png_data = crate::compose::encode_png(&pixels).expect("encode");
        Raster {
            width: 50,
            height: 100,
            png_data,
        }
    }

    fn small_spec() -> StickerSpec {
        StickerSpec {
            display_width: 50,
            aspect_ratio: 2.0,
            export_width: 50,
            export_height: 100,
            document_width_mm: 100.0,
            document_height_mm: 200.0,
        }
    }

    #[test]
    fn produces_a_parseable_single_page_document() {
        let pdf = write_single_page(&small_raster(), &small_spec()).expect("write");
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/MediaBox [0 0 283.46 566.93]"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("/Im0 Do"));
        assert!(text.contains("/Filter /FlateDecode"));
    }

    #[test]
    fn page_ratio_matches_document_ratio() {
        let spec = small_spec();
        let (w, h) = page_size_pt(&spec);
        let page_ratio = h / w;
        let document_ratio = spec.document_height_mm / spec.document_width_mm;
        assert!((page_ratio - document_ratio).abs() < 1e-9);
        assert!((page_ratio - spec.aspect_ratio).abs() < 1e-9);
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = write_single_page(&small_raster(), &small_spec()).expect("write");
        let text = String::from_utf8_lossy(&pdf);
        let xref_at = text.rfind("\nxref\n").expect("xref table") + 1;
        // Each in-use entry must point at an "N 0 obj" line
        for (index, line) in text[xref_at..].lines().skip(3).take(5).enumerate() {
            let offset: usize = line.split_whitespace().next().unwrap().parse().unwrap();
            let expected = format!("{} 0 obj", index + 1);
            assert!(
                pdf[offset..].starts_with(expected.as_bytes()),
                "object {} offset {} does not point at its header",
                index + 1,
                offset
            );
        }
    }

    #[test]
    fn zero_document_size_is_an_encoding_error() {
        let spec = StickerSpec {
            document_width_mm: 0.0,
            ..small_spec()
        };
        assert!(matches!(
            write_single_page(&small_raster(), &spec),
            Err(Error::Encoding(_))
        ));
    }
}
