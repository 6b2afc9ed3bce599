//! The sticker exporter.
//!
//! Converts a live, screen-rendered node tree into a pixel-exact raster at a
//! fixed aspect ratio, then optionally wraps it into a single-page printable
//! document or a print-dialog payload. Within one export the steps run
//! strictly in order: clone → rewrite/embed → stage → bounded asset wait →
//! rasterize → unstage → cover-fit composite → encode. The staged copy is
//! removed on every exit path, success or failure.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::{self, AssetCache};
use crate::compose;
use crate::document;
use crate::error::{Error, Result};
use crate::print::{self, PrintJob};
use crate::proxy::ProxyClient;
use crate::qr;
use crate::rendering::raster;
use crate::surface::{NodeId, Surface};
use crate::{ExporterConfig, Raster, StickerSpec};

pub struct StickerExporter {
    config: ExporterConfig,
    proxy: ProxyClient,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag on drop, so the lock clears on every exit
/// path, including early returns and panics.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StickerExporter {
    pub fn new(config: ExporterConfig) -> Result<Self> {
        let proxy = ProxyClient::new(&config)?;
        Ok(Self {
            config,
            proxy,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Whether an export operation is currently running on this exporter.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Only one export may run at a time per exporter: overlapping offscreen
    /// staging would corrupt shared surface state and double-deliver output.
    fn acquire(&self) -> Result<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    /// Capture the mounted node `source` as a PNG raster of exactly
    /// `spec.export_width` x `spec.export_height` pixels.
    pub async fn capture_raster(
        &self,
        surface: &mut Surface,
        source: NodeId,
        spec: &StickerSpec,
    ) -> Result<Raster> {
        let _guard = self.acquire()?;
        self.capture_locked(surface, source, spec).await
    }

    /// Capture, then wrap the raster into a single-page full-bleed PDF.
    pub async fn export_document(
        &self,
        surface: &mut Surface,
        source: NodeId,
        spec: &StickerSpec,
    ) -> Result<Vec<u8>> {
        let _guard = self.acquire()?;
        let captured = self.capture_locked(surface, source, spec).await?;
        document::write_single_page(&captured, spec)
    }

    /// Capture, then build the self-printing payload. The image is shown with
    /// contain fit; paper dimensions are not guaranteed to match the sticker
    /// ratio.
    pub async fn export_for_print(
        &self,
        surface: &mut Surface,
        source: NodeId,
        spec: &StickerSpec,
        business_name: &str,
    ) -> Result<PrintJob> {
        let _guard = self.acquire()?;
        let captured = self.capture_locked(surface, source, spec).await?;
        Ok(print::build_print_job(&captured, business_name))
    }

    async fn capture_locked(
        &self,
        surface: &mut Surface,
        source: NodeId,
        spec: &StickerSpec,
    ) -> Result<Raster> {
        spec.validate().map_err(|e| Error::Capture(e.to_string()))?;

        let node = surface
            .node(source)
            .ok_or_else(|| Error::Capture("source node is not attached to the surface".into()))?;

        // Isolated copy, forced to the exact capture box: the capture can
        // never drift with on-screen reflow, truncation or scrollbars.
        let mut copy = node.clone_for_capture();
        qr::convert_qr_nodes(&mut copy);

        surface.stage(copy, spec.display_width, spec.display_height())?;
        let staged_result = self.render_staged(surface, spec).await;
        // The staging slot never outlives the export, success or failure.
        surface.unstage();
        let raw = staged_result?;

        let composed = compose::cover_fit(&raw, spec.export_width, spec.export_height)?;
        let png_data = compose::encode_png(&composed)?;

        log::info!(
            "captured sticker raster: {}x{} ({} bytes)",
            composed.width(),
            composed.height(),
            png_data.len()
        );

        Ok(Raster {
            width: composed.width(),
            height: composed.height(),
            png_data,
        })
    }

    /// Resolve the staged copy's assets under the shared deadline, then
    /// rasterize it at the export scale.
    async fn render_staged(
        &self,
        surface: &mut Surface,
        spec: &StickerSpec,
    ) -> Result<image::RgbaImage> {
        let deadline_ms = self.config.asset_deadline_ms;
        let staged = surface
            .staged_mut()
            .ok_or_else(|| Error::Capture("staging slot emptied mid-export".into()))?;

        let mut cache = AssetCache::new();
        let unresolved =
            assets::resolve_assets(&mut staged.root, &self.proxy, &mut cache, deadline_ms).await;
        if unresolved > 0 {
            log::warn!(
                "proceeding with {} image(s) unresolved after {}ms deadline",
                unresolved,
                deadline_ms
            );
        }

        let staged = surface
            .staged()
            .ok_or_else(|| Error::Capture("staging slot emptied mid-export".into()))?;
        raster::rasterize(staged, spec.export_scale())
    }
}

/// Re-decode a delivered raster and check its pixel dimensions against the
/// spec. A mismatch is a non-fatal warning: the file is still delivered, but
/// print shops need to know the guarantee silently failed.
pub fn verify_raster(raster: &Raster, spec: &StickerSpec) -> bool {
    match compose::decode_dimensions(&raster.png_data) {
        Ok((w, h)) if w == spec.export_width && h == spec.export_height => true,
        Ok((w, h)) => {
            log::warn!(
                "raster dimensions {}x{} do not match the requested {}x{}",
                w,
                h,
                spec.export_width,
                spec.export_height
            );
            false
        }
        Err(e) => {
            log::warn!("raster verification failed to decode: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template;
    use crate::{BusinessRecord, Review};

    fn test_spec() -> StickerSpec {
        StickerSpec {
            display_width: 100,
            aspect_ratio: 2.0,
            export_width: 500,
            export_height: 1000,
            document_width_mm: 50.0,
            document_height_mm: 100.0,
        }
    }

    fn offline_record() -> BusinessRecord {
        // No photo URLs: captures complete without any network traffic
        BusinessRecord {
            name: "Cafe Mondo".into(),
            address: "1 Harbour Way".into(),
            rating: 4.0,
            review_count: 12,
            reviews: vec![Review {
                author: "Kim".into(),
                rating: 4.0,
                text: "Great crema.".into(),
            }],
            ..Default::default()
        }
    }

    fn exporter() -> StickerExporter {
        StickerExporter::new(ExporterConfig {
            asset_deadline_ms: 300,
            ..Default::default()
        })
        .expect("Failed to create exporter")
    }

    #[tokio::test]
    async fn capture_produces_exact_dimensions() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);

        let spec = test_spec();
        let raster = exporter()
            .capture_raster(&mut surface, source, &spec)
            .await
            .expect("capture");
        assert_eq!((raster.width, raster.height), (500, 1000));
        assert!(verify_raster(&raster, &spec));
    }

    #[tokio::test]
    async fn capture_is_idempotent_on_an_unchanged_tree() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);

        let spec = test_spec();
        let exporter = exporter();
        let first = exporter
            .capture_raster(&mut surface, source, &spec)
            .await
            .expect("first capture");
        let second = exporter
            .capture_raster(&mut surface, source, &spec)
            .await
            .expect("second capture");
        assert_eq!((first.width, first.height), (second.width, second.height));
    }

    #[tokio::test]
    async fn staging_is_cleaned_up_after_success_and_failure() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);
        let exporter = exporter();

        let ok = exporter
            .capture_raster(&mut surface, source, &test_spec())
            .await;
        assert!(ok.is_ok());
        assert_eq!(surface.staged_count(), 0);

        // Zero display width must fail cleanly, not divide by zero
        let bad_spec = StickerSpec {
            display_width: 0,
            ..test_spec()
        };
        let err = exporter
            .capture_raster(&mut surface, source, &bad_spec)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
        assert_eq!(surface.staged_count(), 0);
        assert!(!exporter.is_busy());
    }

    #[tokio::test]
    async fn detached_source_is_a_capture_error() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);
        surface.unmount(source);

        let err = exporter()
            .capture_raster(&mut surface, source, &test_spec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
        assert_eq!(surface.staged_count(), 0);
    }

    #[tokio::test]
    async fn document_export_matches_page_geometry() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);

        let spec = test_spec();
        let pdf = exporter()
            .export_document(&mut surface, source, &spec)
            .await
            .expect("document");
        assert!(pdf.starts_with(b"%PDF-1.4"));
        let text = String::from_utf8_lossy(&pdf);
        // 50x100mm -> 141.73x283.46pt
        assert!(text.contains("/MediaBox [0 0 141.73 283.46]"));
        assert_eq!(surface.staged_count(), 0);
    }

    #[tokio::test]
    async fn print_export_wraps_the_same_raster() {
        let mut surface = Surface::new();
        let tree = template::build_sticker_tree(&offline_record(), "https://cafemondo.example");
        let source = surface.mount(tree);

        let job = exporter()
            .export_for_print(&mut surface, source, &test_spec(), "Cafe Mondo")
            .await
            .expect("print");
        assert!(job.html.contains("object-fit: contain"));
        assert_eq!(job.file_name, "cafe-mondo-sticker.html");
    }

    #[test]
    fn second_export_is_rejected_while_one_is_in_flight() {
        let exporter = exporter();
        let guard = exporter.acquire().expect("first acquire");
        assert!(exporter.is_busy());
        assert!(matches!(exporter.acquire(), Err(Error::Busy)));
        drop(guard);
        assert!(!exporter.is_busy());
        assert!(exporter.acquire().is_ok());
    }
}
