//! Srcset Core - responsive image derivative generation.
//!
//! Takes a tree of source photographs and produces, for each one, a set of
//! resized derivatives in several encodings plus an aggregate JSON manifest
//! that a page layer reads to render `<picture>` elements.
//!
//! # Architecture
//!
//! ```text
//! Discover → Decode → Plan widths → Resize/Encode (+ blur) → Write → Manifest
//! ```
//!
//! Each source ends in exactly one of three states (written, placeholder,
//! failed). The manifest is folded from the per-source results after every
//! source has been attempted and is always rewritten in full.
//!
//! # Usage
//!
//! ```rust,ignore
//! use srcset_core::{Config, Generator};
//!
//! #[tokio::main]
//! async fn main() -> srcset_core::Result<()> {
//!     let site = std::path::Path::new(".");
//!     let config = Config::load_for_site(site, None)?;
//!     let layout = config.layout(site)?;
//!
//!     let report = Generator::new(config).generate(&layout).await?;
//!     println!("{} sets, manifest at {:?}", report.succeeded(), report.manifest_path);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use error::{CodecError, ConfigError, PipelineError, PipelineResult, Result, SrcsetError};
pub use generator::Generator;
pub use layout::{DerivativeBase, SiteLayout};
pub use manifest::Manifest;
pub use pipeline::{ImageCodec, RasterCodec, SourceResult};
pub use types::{
    Collision, DerivativeFormat, DerivativeRef, FailedSource, FileStatus, ManifestEntry,
    RunReport, VerifyReport,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
