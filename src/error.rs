//! Error types for the sticker export engine

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a sticker export
#[derive(Error, Debug)]
pub enum Error {
    /// Offscreen staging or rasterization failed. Fatal to the current export.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// An individual remote image could not be fetched or decoded.
    /// Recoverable: the export proceeds without that image.
    #[error("Asset fetch failed for {url}: {reason}")]
    AssetFetch { url: String, reason: String },

    /// Document packaging failed after a successful raster capture.
    /// Fatal to the document output only.
    #[error("Document encoding failed: {0}")]
    Encoding(String),

    /// The sticker spec violates the shared aspect-ratio invariant
    #[error("Invalid sticker spec: {0}")]
    Spec(String),

    /// The asset proxy returned a transport-level failure
    #[error("Proxy request failed: {0}")]
    Proxy(String),

    /// An export operation is already in flight on this exporter
    #[error("An export is already in flight")]
    Busy,
}
