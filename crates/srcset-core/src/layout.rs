//! Mapping between source files, derivative files, and manifest keys.
//!
//! The output tree mirrors the source tree: `src/portraits/alex.jpg` becomes
//! `out/portraits/alex-960.webp`, `out/portraits/alex.webp`, and so on. Manifest
//! keys and derivative paths are expressed relative to the web root with `/`
//! separators so the page layer can use them as URLs directly.

use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;
use crate::types::DerivativeFormat;

/// Resolved source, output and web root directories for one site.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    source_root: PathBuf,
    output_root: PathBuf,
    web_root: PathBuf,
    manifest_name: String,
}

impl SiteLayout {
    /// Build a layout, rejecting an output root that is the source root or
    /// contains it. Either would put derivatives inside the source tree where
    /// they overwrite sources and get rediscovered on the next run.
    pub fn new(
        source_root: PathBuf,
        output_root: PathBuf,
        web_root: PathBuf,
        manifest_name: &str,
    ) -> Result<Self, ConfigError> {
        let source_root = normalize(&source_root);
        let output_root = normalize(&output_root);
        if source_root == output_root {
            return Err(ConfigError::ValidationError(format!(
                "paths.output_dir must differ from paths.source_dir ({}); \
                 full-size derivatives would overwrite their sources",
                source_root.display()
            )));
        }
        if source_root.starts_with(&output_root) {
            return Err(ConfigError::ValidationError(format!(
                "paths.output_dir ({}) must not contain paths.source_dir ({})",
                output_root.display(),
                source_root.display()
            )));
        }
        Ok(Self {
            source_root,
            output_root,
            web_root: normalize(&web_root),
            manifest_name: manifest_name.to_string(),
        })
    }

    /// Directory scanned for sources.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Directory derivatives are written under.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Where the manifest is written.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_root.join(&self.manifest_name)
    }

    /// The output root, if it sits inside the source root and must be skipped
    /// during discovery.
    pub fn nested_output(&self) -> Option<&Path> {
        self.output_root
            .starts_with(&self.source_root)
            .then_some(self.output_root.as_path())
    }

    /// Compute where the derivatives of `source` go and which key they get.
    pub fn derivative_base(&self, source: &Path) -> DerivativeBase {
        let rel = source
            .strip_prefix(&self.source_root)
            .unwrap_or_else(|_| Path::new(source.file_name().unwrap_or_default()));
        let dir = match rel.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.output_root.join(parent),
            _ => self.output_root.clone(),
        };
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = self.web_relative(&dir.join(&stem));

        DerivativeBase {
            source: source.to_path_buf(),
            dir,
            stem,
            key,
        }
    }

    /// Express a path under the output root as a `/`-separated web path.
    ///
    /// Paths inside the web root are made relative to it; otherwise they are
    /// made relative to the output root.
    pub fn web_relative(&self, path: &Path) -> String {
        let rel = path
            .strip_prefix(&self.web_root)
            .or_else(|_| path.strip_prefix(&self.output_root))
            .unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Output location and manifest key for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeBase {
    /// The source file
    pub source: PathBuf,
    /// Output directory for this source's derivatives
    pub dir: PathBuf,
    /// Source file name without its extension
    pub stem: String,
    /// Normalized base path, used as manifest key and `base` field
    pub key: String,
}

impl DerivativeBase {
    /// `<dir>/<stem>-<width>.<ext>`
    pub fn responsive_path(&self, width: u32, format: DerivativeFormat) -> PathBuf {
        self.dir
            .join(format!("{}-{}.{}", self.stem, width, format.extension()))
    }

    /// `<dir>/<stem>.<ext>`
    pub fn full_path(&self, format: DerivativeFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, format.extension()))
    }

    /// Web path of a responsive derivative, as stored in the manifest.
    pub fn responsive_web_path(&self, width: u32, format: DerivativeFormat) -> String {
        format!("{}-{}.{}", self.key, width, format.extension())
    }
}

/// Lexically remove `.` components and trailing separators so equality checks
/// and prefix stripping behave for user-supplied paths.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
