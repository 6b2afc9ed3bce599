//! QR badge pre-conversion.
//!
//! Call-to-action QR nodes are rendered to raw rasters during capture
//! preparation, before the tree is staged. Readiness is therefore structural:
//! the capture never waits on a QR sub-widget, so no settle-delay heuristic
//! is needed.

use image::{Rgba, RgbaImage};
use qrcode::{Color as Module, EcLevel, QrCode};

use crate::assets::EmbeddableImage;
use crate::error::{Error, Result};
use crate::node::{ImageSource, NodeKind, RenderableNode};

/// Quiet-zone width in modules, per the QR specification minimum.
const QUIET_ZONE: usize = 4;

/// Render `payload` as a QR raster roughly `size` pixels on a side.
///
/// Modules are plotted by hand so the module scale always lands on integer
/// pixels; the result may be slightly larger than `size`, never smaller than
/// one pixel per module.
pub fn render_qr(payload: &str, size: u32) -> Result<EmbeddableImage> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| Error::Capture(format!("QR encoding failed: {}", e)))?;

    let grid = code.width();
    let modules = grid + QUIET_ZONE * 2;
    let module_px = ((size as usize) / modules).max(1);
    let edge = (modules * module_px) as u32;

    let mut img = RgbaImage::from_pixel(edge, edge, Rgba([255, 255, 255, 255]));
    let quiet_px = QUIET_ZONE * module_px;

    for (y, row) in code.to_colors().chunks(grid).enumerate() {
        for (x, &module) in row.iter().enumerate() {
            if module == Module::Dark {
                let x0 = quiet_px + x * module_px;
                let y0 = quiet_px + y * module_px;
                for dy in 0..module_px {
                    for dx in 0..module_px {
                        img.put_pixel((x0 + dx) as u32, (y0 + dy) as u32, Rgba([0, 0, 0, 255]));
                    }
                }
            }
        }
    }

    Ok(EmbeddableImage::from_pixels(img))
}

/// Replace every QR node in the subtree with an embedded-raster image node.
///
/// Encoding failures are per-node and non-fatal: the node is left in place
/// and simply renders as an empty box, matching the best-effort asset policy.
pub fn convert_qr_nodes(root: &mut RenderableNode) {
    root.for_each_node_mut(&mut |node| {
        if let NodeKind::Qr { payload, size } = &node.kind {
            match render_qr(payload, *size) {
                Ok(image) => {
                    node.kind = NodeKind::Image {
                        source: ImageSource::Embedded(image),
                        height: *size,
                    };
                }
                Err(e) => log::warn!("QR badge skipped: {}", e),
            }
        }
    });
}
