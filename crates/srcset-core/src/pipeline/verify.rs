//! Read-only check that every source has a base derivative on disk.

use crate::layout::SiteLayout;
use crate::types::{DerivativeFormat, VerifyReport};

use super::discovery::DiscoveredFile;

/// Checks derivative presence without writing anything.
pub struct Verifier {
    formats: Vec<DerivativeFormat>,
}

impl Verifier {
    /// Create a verifier accepting any of `formats` as the base sibling.
    pub fn new(formats: Vec<DerivativeFormat>) -> Self {
        Self { formats }
    }

    /// A source passes when `<base>.<ext>` exists for at least one format.
    pub fn verify(&self, layout: &SiteLayout, files: &[DiscoveredFile]) -> VerifyReport {
        let mut report = VerifyReport {
            checked: files.len(),
            missing: Vec::new(),
        };

        for file in files {
            let base = layout.derivative_base(&file.path);
            let present = self
                .formats
                .iter()
                .any(|&format| base.full_path(format).is_file());
            if !present {
                tracing::warn!("Derivatives missing for: {}", file.path.display());
                report.missing.push(file.path.clone());
            }
        }

        report
    }
}
