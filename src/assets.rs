//! Embeddable image conversion and the bounded asset-readiness wait.
//!
//! Every image that must appear in a capture is converted to a raw-pixel
//! payload first: remote URLs may be cross-origin-restricted or simply not
//! resolve inside an offscreen capture, so the staged copy only ever blits
//! pixels that are already decoded. Conversions are memoized per export
//! session and discarded with it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use futures::stream::{FuturesUnordered, StreamExt};
use image::RgbaImage;

use crate::error::{Error, Result};
use crate::node::{ImageSource, NodeKind, RenderableNode};
use crate::proxy::ProxyClient;

/// A self-contained raw-pixel image payload.
///
/// Cheap to clone: the pixel buffer is shared.
#[derive(Debug, Clone)]
pub struct EmbeddableImage {
    pixels: Arc<RgbaImage>,
}

impl EmbeddableImage {
    pub fn from_pixels(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into pixels. The container
    /// format is sniffed from the bytes, not trusted from any content-type.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::Capture(format!("image decode failed: {}", e)))?;
        Ok(Self::from_pixels(decoded.to_rgba8()))
    }

    /// Decode a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::Capture(format!("not a data URI: {}", truncate(uri))))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::Capture(format!("malformed data URI: {}", truncate(uri))))?;
        if !meta.ends_with(";base64") {
            return Err(Error::Capture(format!(
                "unsupported data URI encoding: {}",
                meta
            )));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::Capture(format!("data URI base64 decode failed: {}", e)))?;
        Self::decode(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

fn truncate(s: &str) -> String {
    if s.len() > 48 {
        format!("{}...", &s[..48])
    } else {
        s.to_string()
    }
}

/// Per-export-session memo of URL -> converted image.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: HashMap<String, EmbeddableImage>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&EmbeddableImage> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, url: String, image: EmbeddableImage) {
        self.entries.insert(url, image);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Convert every image reference in `root` to an embedded raster, best-effort.
///
/// Data URIs decode inline; distinct remote URLs fan out as concurrent
/// fetch+decode tasks, all racing one shared deadline. On expiry the export
/// proceeds with whichever images resolved; one stalled asset must not block
/// the whole export. Returns the number of image nodes left unresolved.
pub async fn resolve_assets(
    root: &mut RenderableNode,
    proxy: &ProxyClient,
    cache: &mut AssetCache,
    deadline_ms: u64,
) -> usize {
    // Inline payloads first: no network involved.
    root.for_each_node_mut(&mut |node| {
        if let NodeKind::Image { source, .. } = &mut node.kind {
            if let ImageSource::DataUri(uri) = source {
                if let Some(hit) = cache.get(uri.as_str()) {
                    *source = ImageSource::Embedded(hit.clone());
                    return;
                }
                match EmbeddableImage::from_data_uri(uri) {
                    Ok(image) => {
                        cache.insert(uri.clone(), image.clone());
                        *source = ImageSource::Embedded(image);
                    }
                    Err(e) => log::warn!("inline image skipped: {}", e),
                }
            }
        }
    });

    // Collect the distinct remote URLs still needing conversion.
    let mut urls: Vec<String> = Vec::new();
    root.for_each_node(&mut |node| {
        if let NodeKind::Image { source, .. } = &node.kind {
            if let Some(url) = source.remote_url() {
                if !cache.contains(url) && !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
        }
    });

    if !urls.is_empty() {
        let deadline = tokio::time::sleep(Duration::from_millis(deadline_ms));
        tokio::pin!(deadline);

        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .map(|url| {
                let url = url.clone();
                async move {
                    let outcome = fetch_and_decode(proxy, &url).await;
                    (url, outcome)
                }
            })
            .collect();

        while !pending.is_empty() {
            tokio::select! {
                completed = pending.next() => {
                    if let Some((url, outcome)) = completed {
                        match outcome {
                            Ok(image) => {
                                cache.insert(url, image);
                            }
                            Err(e) => log::warn!("asset skipped: {}", e),
                        }
                    }
                }
                _ = &mut deadline => {
                    log::warn!(
                        "asset readiness wait abandoned after {}ms with {} fetch(es) outstanding",
                        deadline_ms,
                        pending.len()
                    );
                    break;
                }
            }
        }
    }

    // Swap in whatever resolved; count what did not.
    let mut unresolved = 0usize;
    root.for_each_node_mut(&mut |node| {
        if let NodeKind::Image { source, .. } = &mut node.kind {
            let converted = source
                .remote_url()
                .and_then(|url| cache.get(url))
                .cloned();
            if let Some(image) = converted {
                *source = ImageSource::Embedded(image);
            }
            if !source.is_resolved() {
                unresolved += 1;
            }
        }
    });
    unresolved
}

async fn fetch_and_decode(proxy: &ProxyClient, url: &str) -> Result<EmbeddableImage> {
    let asset = proxy.fetch(url).await?;
    EmbeddableImage::decode(&asset.bytes).map_err(|e| Error::AssetFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
