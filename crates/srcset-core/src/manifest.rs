//! The aggregate manifest: normalized base path → [`ManifestEntry`].
//!
//! The manifest is rebuilt from scratch on every run and written once, after
//! every source has been attempted. It replaces any previous manifest in full.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SrcsetError};
use crate::types::ManifestEntry;

/// Index of every processed source, keyed by normalized base path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry under its `base` key, returning the entry it replaced.
    pub fn insert(&mut self, entry: ManifestEntry) -> Option<ManifestEntry> {
        self.entries.insert(entry.base.clone(), entry)
    }

    /// Look up an entry. Callers treat `None` as "no optimized derivative".
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manifest keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to any writer, followed by a newline.
    pub fn write_to<W: Write>(&self, mut writer: W, pretty: bool) -> io::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut writer, self).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut writer, self).map_err(io::Error::other)?;
        }
        writeln!(writer)?;
        writer.flush()
    }

    /// Write the manifest as pretty JSON to `path`, creating parent directories.
    ///
    /// Any failure here is fatal to the run.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write = || -> io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            self.write_to(BufWriter::new(file), true)
        };
        write().map_err(|source| SrcsetError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a manifest written by [`Manifest::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DerivativeFormat, DerivativeRef};

    fn entry(base: &str, width: u32) -> ManifestEntry {
        let mut variants = BTreeMap::new();
        variants.insert(
            DerivativeFormat::Webp,
            vec![DerivativeRef {
                width,
                path: format!("{base}-{width}.webp"),
            }],
        );
        ManifestEntry {
            width,
            height: width / 2,
            base: base.to_string(),
            variants,
            blur_data_url: "data:image/jpeg;base64,AA==".to_string(),
            placeholder: false,
        }
    }

    fn manifest_of(entries: Vec<ManifestEntry>) -> Manifest {
        let mut manifest = Manifest::new();
        for entry in entries {
            manifest.insert(entry);
        }
        manifest
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut manifest = Manifest::new();
        assert!(manifest.insert(entry("images/a", 100)).is_none());
        let previous = manifest.insert(entry("images/a", 200)).unwrap();

        assert_eq!(previous.width, 100);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("images/a").unwrap().width, 200);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let manifest = manifest_of(vec![entry("images/b", 10), entry("images/a", 20)]);

        let mut buffer = Vec::new();
        manifest.write_to(&mut buffer, false).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.starts_with("{\"images/a\":{"));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["images/b"]["webp"][0]["path"], "images/b-10.webp");
    }

    #[test]
    fn test_empty_manifest_is_empty_object() {
        let mut buffer = Vec::new();
        Manifest::new().write_to(&mut buffer, true).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().trim(), "{}");
    }

    #[test]
    fn test_save_creates_parent_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("manifest.json");

        let first = manifest_of(vec![entry("images/a", 10), entry("images/b", 10)]);
        first.save(&path).unwrap();

        let second = manifest_of(vec![entry("images/c", 10)]);
        second.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["images/c"]);
    }

    #[test]
    fn test_save_failure_is_manifest_write_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let err = Manifest::new()
            .save(&blocker.join("manifest.json"))
            .unwrap_err();
        assert!(matches!(err, SrcsetError::ManifestWrite { .. }));
    }
}
