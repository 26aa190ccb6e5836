//! Configuration validation with range checks.

use std::collections::HashSet;

use crate::error::ConfigError;

use super::Config;

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.derivatives;
        if d.target_widths.is_empty() {
            return Err(invalid("derivatives.target_widths must not be empty"));
        }
        if d.target_widths.contains(&0) {
            return Err(invalid("derivatives.target_widths must all be > 0"));
        }
        if d.max_full_width == 0 {
            return Err(invalid("derivatives.max_full_width must be > 0"));
        }
        if d.formats.is_empty() {
            return Err(invalid("derivatives.formats must not be empty"));
        }
        let unique: HashSet<_> = d.formats.iter().collect();
        if unique.len() != d.formats.len() {
            return Err(invalid("derivatives.formats contains duplicates"));
        }
        for (name, q) in d.quality.values() {
            if !(1..=100).contains(&q) {
                return Err(invalid(format!(
                    "derivatives.quality.{name} must be between 1 and 100"
                )));
            }
        }
        if !(1..=10).contains(&d.avif_speed) {
            return Err(invalid("derivatives.avif_speed must be between 1 and 10"));
        }

        if self.blur.width == 0 {
            return Err(invalid("blur.width must be > 0"));
        }
        if !(1..=100).contains(&self.blur.quality) {
            return Err(invalid("blur.quality must be between 1 and 100"));
        }

        let f = &self.fallback;
        if f.width == 0 || f.height == 0 {
            return Err(invalid("fallback.width and fallback.height must be > 0"));
        }
        for (name, q) in f.quality.values() {
            if !(1..=100).contains(&q) {
                return Err(invalid(format!(
                    "fallback.quality.{name} must be between 1 and 100"
                )));
            }
        }

        if self.processing.supported_extensions.is_empty() {
            return Err(invalid("processing.supported_extensions must not be empty"));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(invalid("limits.max_file_size_mb must be > 0"));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(invalid("limits.max_image_dimension must be > 0"));
        }

        let p = &self.paths;
        if p.source_dir.trim().is_empty() || p.output_dir.trim().is_empty() {
            return Err(invalid("paths.source_dir and paths.output_dir must be set"));
        }
        if p.manifest_name.is_empty() || p.manifest_name.contains(['/', '\\']) {
            return Err(invalid("paths.manifest_name must be a plain file name"));
        }
        Ok(())
    }
}
