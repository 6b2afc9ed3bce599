//! Stickerpress
//!
//! A capture engine that turns a live, screen-rendered sticker template into a
//! pixel-exact raster at a fixed aspect ratio, independent of how the source
//! tree is actually sized on screen, and packages the result as a PNG
//! download, a single-page full-bleed PDF, or a print-dialog payload.
//!
//! # Example
//!
//! ```no_run
//! use stickerpress::{BusinessRecord, ExporterConfig, StickerExporter, StickerSpec, Surface};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let record = BusinessRecord {
//!     name: "Blue Bottle Coffee".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut surface = Surface::new();
//! let tree = stickerpress::template::build_sticker_tree(&record, "https://bluebottle.example");
//! let source = surface.mount(tree);
//!
//! let exporter = StickerExporter::new(ExporterConfig::default())?;
//! let raster = exporter
//!     .capture_raster(&mut surface, source, &StickerSpec::default())
//!     .await?;
//! println!("captured {}x{}", raster.width, raster.height);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod assets;
pub mod compose;
pub mod document;
pub mod exporter;
pub mod node;
pub mod print;
pub mod proxy;
pub mod qr;
pub mod rendering;
pub mod surface;
pub mod template;

pub use assets::{AssetCache, EmbeddableImage};
pub use exporter::StickerExporter;
pub use node::{NodeKind, RenderableNode};
pub use surface::{NodeId, Surface};

/// Fixed capture geometry for one sticker design.
///
/// This is a configuration value, not user-editable at runtime. All four
/// width/height pairs must share the same aspect ratio; a violation is a
/// defect in the caller, surfaced by [`StickerSpec::validate`].
///
/// # Examples
///
/// ```
/// let spec = stickerpress::StickerSpec::default();
/// assert!(spec.validate().is_ok());
/// assert_eq!(spec.export_height, spec.export_width * 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickerSpec {
    /// On-screen render width in pixels
    pub display_width: u32,
    /// Height = width x ratio (the sticker design is always 1:2)
    pub aspect_ratio: f64,
    /// Target raster width in pixels
    pub export_width: u32,
    /// Target raster height in pixels
    pub export_height: u32,
    /// Physical document width in millimetres
    pub document_width_mm: f64,
    /// Physical document height in millimetres
    pub document_height_mm: f64,
}

impl Default for StickerSpec {
    fn default() -> Self {
        Self {
            display_width: 400,
            aspect_ratio: 2.0,
            export_width: 10000,
            export_height: 20000,
            document_width_mm: 100.0,
            document_height_mm: 200.0,
        }
    }
}

impl StickerSpec {
    /// On-screen capture height derived from the forced width and ratio.
    pub fn display_height(&self) -> u32 {
        (self.display_width as f64 * self.aspect_ratio).round() as u32
    }

    /// Uniform scale factor from display space to export space.
    pub fn export_scale(&self) -> f64 {
        self.export_width as f64 / self.display_width as f64
    }

    /// Check the shared aspect-ratio invariant across all width/height pairs.
    pub fn validate(&self) -> Result<()> {
        const EPS: f64 = 1e-6;

        if self.display_width == 0 {
            return Err(Error::Spec("display width must be non-zero".into()));
        }
        if self.export_width == 0 || self.export_height == 0 {
            return Err(Error::Spec("export dimensions must be non-zero".into()));
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(Error::Spec(format!(
                "aspect ratio must be a positive finite number, got {}",
                self.aspect_ratio
            )));
        }

        let export_ratio = self.export_height as f64 / self.export_width as f64;
        if (export_ratio - self.aspect_ratio).abs() > EPS {
            return Err(Error::Spec(format!(
                "export dimensions {}x{} do not match aspect ratio {}",
                self.export_width, self.export_height, self.aspect_ratio
            )));
        }

        if self.document_width_mm <= 0.0 || self.document_height_mm <= 0.0 {
            return Err(Error::Spec("document dimensions must be positive".into()));
        }
        let document_ratio = self.document_height_mm / self.document_width_mm;
        if (document_ratio - self.aspect_ratio).abs() > EPS {
            return Err(Error::Spec(format!(
                "document size {}x{}mm does not match aspect ratio {}",
                self.document_width_mm, self.document_height_mm, self.aspect_ratio
            )));
        }

        Ok(())
    }
}

/// Configuration for the sticker exporter
///
/// Defaults are conservative: a six second shared deadline for remote asset
/// readiness, no proxy endpoint (direct fetches), and a generous HTTP
/// timeout below the asset deadline has no effect on the overall bound.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Asset proxy endpoint; remote cross-origin images are fetched as
    /// `GET <endpoint>?url=<target>`. `None` fetches targets directly.
    pub proxy_endpoint: Option<String>,
    /// Host treated as same-origin; its images bypass the proxy rewrite
    pub origin_host: Option<String>,
    /// Shared deadline for all remote-asset readiness, in milliseconds
    pub asset_deadline_ms: u64,
    /// Per-request HTTP timeout in milliseconds
    pub http_timeout_ms: u64,
    /// User agent string sent with proxy requests
    pub user_agent: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: None,
            origin_host: None,
            asset_deadline_ms: 6000,
            http_timeout_ms: 10000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Stickerpress/0.1".to_string(),
        }
    }
}

/// A finished raster capture
///
/// The PNG payload is guaranteed to decode to exactly `width` x `height`
/// pixels; [`exporter::verify_raster`] re-checks that guarantee for
/// downloads delivered to print shops.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Pixel width of the encoded image
    pub width: u32,
    /// Pixel height of the encoded image
    pub height: u32,
    /// Lossless PNG bytes
    pub png_data: Vec<u8>,
}

/// A business listing record as supplied by the data provider.
///
/// Read-only input to the template builder; the exporter itself never
/// inspects it beyond the name used for output file naming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub hours: Vec<OpeningHours>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

/// A single customer review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: f32,
    pub text: String,
}

/// Opening hours for one weekday
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpeningHours {
    pub day: String,
    pub open: String,
    pub close: String,
}

/// Download file name for an export: business name with whitespace collapsed
/// to hyphens, lowercased, suffixed with `-sticker.<ext>`.
///
/// ```
/// assert_eq!(
///     stickerpress::sticker_file_name("Blue Bottle  Coffee", "png"),
///     "blue-bottle-coffee-sticker.png"
/// );
/// ```
pub fn sticker_file_name(business_name: &str, ext: &str) -> String {
    let slug = business_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("{}-sticker.{}", slug, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_valid() {
        let spec = StickerSpec::default();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.display_height(), 800);
        assert_eq!(spec.export_scale(), 25.0);
    }

    #[test]
    fn test_zero_display_width_rejected() {
        let spec = StickerSpec {
            display_width: 0,
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::Spec(_))));
    }

    #[test]
    fn test_ratio_mismatch_rejected() {
        let spec = StickerSpec {
            export_height: 15000,
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = StickerSpec {
            document_height_mm: 150.0,
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_file_name_slug() {
        assert_eq!(sticker_file_name("Cafe Mondo", "pdf"), "cafe-mondo-sticker.pdf");
        assert_eq!(
            sticker_file_name("  Tre   Fratelli  ", "png"),
            "tre-fratelli-sticker.png"
        );
    }
}
