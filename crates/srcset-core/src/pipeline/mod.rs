//! Derivative pipeline components.
//!
//! This module contains the stages applied to every source image:
//! - **discovery**: Find raster sources in the source tree
//! - **validate**: Size limits and magic-byte sniffing
//! - **decode**: Read and decode sources
//! - **codec**: The decode/resize/encode capability
//! - **plan**: Which widths to produce for a source
//! - **blur**: Inline blur-up placeholders
//! - **fallback**: Flat placeholders for invalid sources
//! - **processor**: Orchestrates one source end to end
//! - **verify**: Read-only derivative presence check

pub mod blur;
pub mod codec;
pub mod decode;
pub mod discovery;
pub mod fallback;
pub mod plan;
pub mod processor;
pub mod validate;
pub mod verify;

// Re-exports for convenient access
pub use blur::BlurGenerator;
pub use codec::{ImageCodec, RasterCodec};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use fallback::FallbackGenerator;
pub use plan::WidthPlan;
pub use processor::{DerivativeProcessor, SourceResult};
pub use validate::{SourceFormat, Validator};
pub use verify::Verifier;
