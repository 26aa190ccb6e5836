//! File discovery for finding source photos in directories.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{Result, SrcsetError};

/// Discovers raster source files in a directory tree.
pub struct FileDiscovery {
    config: ProcessingConfig,
    skip_dir: Option<PathBuf>,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            config,
            skip_dir: None,
        }
    }

    /// Never descend into `dir` (used for an output root nested in the source root).
    pub fn skipping(mut self, dir: Option<&Path>) -> Self {
        self.skip_dir = dir.map(Path::to_path_buf);
        self
    }

    /// Recursively find every supported file under `root`, sorted by path.
    ///
    /// A missing or unreadable root is fatal. Unreadable entries below the root
    /// are logged and skipped; unsupported files are ignored silently.
    pub fn discover(&self, root: &Path) -> Result<Vec<DiscoveredFile>> {
        if !root.is_dir() {
            return Err(SrcsetError::Discovery {
                path: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| self.skip_dir.as_deref() != Some(e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(SrcsetError::Discovery {
                        path: root.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };

            let entry_path = entry.path();
            if entry.file_type().is_file() && self.is_supported(entry_path) {
                if let Ok(meta) = entry.metadata() {
                    files.push(DiscoveredFile {
                        path: entry_path.to_path_buf(),
                        size: meta.len(),
                    });
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_extensions
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
