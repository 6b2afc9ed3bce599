//! Software rendering pipeline for staged capture copies.
//!
//! The staged tree flows through three stages: constraint-box layout,
//! paint-command generation, and rasterization into an RGBA pixel grid at
//! the export scale. The raw raster that comes out of here is an
//! intermediate; cover-fit compositing produces the final artifact.

pub mod layout;
pub mod paint;
pub mod raster;
