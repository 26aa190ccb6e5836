//! Per-source transform: decode, fan out resizes and encodes, write derivatives.
//!
//! Every encode for one source runs on the blocking pool concurrently and all
//! of them are joined before the first file is written, so a codec failure
//! never leaves a half-written derivative set behind.

use futures_util::future::try_join_all;
use image::DynamicImage;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, DerivativeConfig, InvalidSourcePolicy};
use crate::error::{CodecError, PipelineError, PipelineResult};
use crate::layout::DerivativeBase;
use crate::types::{DerivativeFormat, DerivativeRef, FileStatus, ManifestEntry};

use super::blur::BlurGenerator;
use super::codec::ImageCodec;
use super::decode::ImageDecoder;
use super::fallback::FallbackGenerator;
use super::plan::WidthPlan;

/// Immutable outcome of processing one source.
#[derive(Debug, Clone)]
pub struct SourceResult {
    /// The source file
    pub source: PathBuf,
    /// Manifest key of the source
    pub key: String,
    /// Terminal state
    pub status: FileStatus,
    /// Manifest entry, absent for failures
    pub entry: Option<ManifestEntry>,
    /// Derivative files written
    pub files_written: usize,
    /// Error message, present for failures
    pub error: Option<String>,
}

impl SourceResult {
    /// A failed outcome for `base`.
    pub fn failed(base: &DerivativeBase, error: &PipelineError) -> Self {
        Self {
            source: base.source.clone(),
            key: base.key.clone(),
            status: FileStatus::Failed,
            entry: None,
            files_written: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Encoded files plus the manifest entry describing them.
struct Rendered {
    entry: ManifestEntry,
    files: Vec<(PathBuf, Vec<u8>)>,
}

/// Turns one source image into its derivative set.
pub struct DerivativeProcessor {
    codec: Arc<dyn ImageCodec>,
    decoder: ImageDecoder,
    blur: BlurGenerator,
    fallback: FallbackGenerator,
    derivatives: DerivativeConfig,
    blur_width: u32,
    policy: InvalidSourcePolicy,
}

impl DerivativeProcessor {
    /// Create a processor for the given configuration and codec.
    pub fn new(config: &Config, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone(), Arc::clone(&codec)),
            codec,
            blur: BlurGenerator::new(config.blur.clone()),
            fallback: FallbackGenerator::new(config.fallback.clone()),
            derivatives: config.derivatives.clone(),
            blur_width: config.blur.width,
            policy: config.fallback.on_invalid_source,
        }
    }

    /// Process one source to a terminal state. Never returns an error: failures
    /// are logged and reported in the result.
    pub async fn process(&self, base: &DerivativeBase) -> SourceResult {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {:?}", base.source);

        let rendered = match self.render(base).await {
            Ok(rendered) => Ok((rendered, FileStatus::Written)),
            Err(e) if e.is_invalid_source() && self.policy == InvalidSourcePolicy::Placeholder => {
                tracing::warn!("Invalid source {:?} replaced with placeholder: {}", base.source, e);
                self.render_placeholder(base)
                    .await
                    .map(|rendered| (rendered, FileStatus::Placeholder))
            }
            Err(e) => Err(e),
        };

        let outcome = match rendered {
            Ok((rendered, status)) => write_files(&rendered.files)
                .await
                .map(|written| (rendered.entry, written, status)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((entry, files_written, status)) => {
                tracing::debug!(
                    "Processed {:?} in {:?} ({} files)",
                    base.source,
                    start.elapsed(),
                    files_written
                );
                SourceResult {
                    source: base.source.clone(),
                    key: base.key.clone(),
                    status,
                    entry: Some(entry),
                    files_written,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Failed: {:?} - {}", base.source, e);
                SourceResult::failed(base, &e)
            }
        }
    }

    /// Decode the source and encode its full derivative set in memory.
    async fn render(&self, base: &DerivativeBase) -> PipelineResult<Rendered> {
        let decoded = self.decoder.decode(&base.source).await?;
        let plan = WidthPlan::new(
            decoded.width,
            &self.derivatives.target_widths,
            self.derivatives.max_full_width,
        );
        let source = Arc::new(decoded.image);

        // One resize per distinct width, shared by every format
        let resize_jobs = plan.distinct_widths().into_iter().map(|width| {
            let codec = Arc::clone(&self.codec);
            let source = Arc::clone(&source);
            async move {
                let image = run_blocking(&base.source, "resize", width, move || {
                    Ok(codec.resize(&source, width))
                })
                .await?;
                Ok::<_, PipelineError>((width, Arc::new(image)))
            }
        });
        let resized: HashMap<u32, Arc<DynamicImage>> =
            try_join_all(resize_jobs).await?.into_iter().collect();

        let encode_jobs = resized.iter().flat_map(|(&width, image)| {
            self.derivatives.formats.iter().map(move |&format| {
                let codec = Arc::clone(&self.codec);
                let image = Arc::clone(image);
                let quality = self.derivatives.quality.for_format(format);
                async move {
                    let bytes = run_blocking(&base.source, format.extension(), width, move || {
                        codec.encode(&image, format, quality)
                    })
                    .await?;
                    Ok::<_, PipelineError>(((width, format), bytes))
                }
            })
        });

        let blur_job = {
            let codec = Arc::clone(&self.codec);
            let generator = self.blur.clone();
            let source = Arc::clone(&source);
            run_blocking(&base.source, "blur", self.blur_width, move || {
                generator.generate(codec.as_ref(), &source)
            })
        };

        let (encoded, blur_data_url) = tokio::join!(try_join_all(encode_jobs), blur_job);
        let mut encoded: HashMap<(u32, DerivativeFormat), Vec<u8>> =
            encoded?.into_iter().collect();
        let blur_data_url = blur_data_url?;

        // Buffers move out of the map; only a responsive width equal to the
        // full width needs its bytes twice.
        let mut take = |width: u32, format: DerivativeFormat, shared: bool| {
            let bytes = if shared {
                encoded.get(&(width, format)).cloned()
            } else {
                encoded.remove(&(width, format))
            };
            bytes.ok_or_else(|| PipelineError::Encode {
                path: base.source.clone(),
                format: format.extension().to_string(),
                width,
                message: "missing encoded derivative".to_string(),
            })
        };

        let mut files = Vec::new();
        let mut variants = BTreeMap::new();
        for &format in &self.derivatives.formats {
            let mut refs = Vec::with_capacity(plan.responsive.len());
            for &width in &plan.responsive {
                let bytes = take(width, format, width == plan.full)?;
                files.push((base.responsive_path(width, format), bytes));
                refs.push(DerivativeRef {
                    width,
                    path: base.responsive_web_path(width, format),
                });
            }
            files.push((base.full_path(format), take(plan.full, format, false)?));
            variants.insert(format, refs);
        }

        Ok(Rendered {
            entry: ManifestEntry {
                width: decoded.width,
                height: decoded.height,
                base: base.key.clone(),
                variants,
                blur_data_url,
                placeholder: false,
            },
            files,
        })
    }

    /// Encode the flat placeholder at the bare base name in every format.
    async fn render_placeholder(&self, base: &DerivativeBase) -> PipelineResult<Rendered> {
        let image = Arc::new(self.fallback.image());
        let (width, height) = self.fallback.dimensions();

        let encode_jobs = self.derivatives.formats.iter().map(|&format| {
            let codec = Arc::clone(&self.codec);
            let image = Arc::clone(&image);
            let quality = self.fallback.quality(format);
            async move {
                let bytes = run_blocking(&base.source, format.extension(), width, move || {
                    codec.encode(&image, format, quality)
                })
                .await?;
                Ok::<_, PipelineError>((base.full_path(format), bytes))
            }
        });
        let files = try_join_all(encode_jobs).await?;

        let blur_data_url = {
            let codec = Arc::clone(&self.codec);
            let generator = self.blur.clone();
            let image = Arc::clone(&image);
            run_blocking(&base.source, "blur", self.blur_width, move || {
                generator.generate(codec.as_ref(), &image)
            })
            .await?
        };

        // No responsive variants for placeholders, only the bare base files
        let variants = self
            .derivatives
            .formats
            .iter()
            .map(|&format| (format, Vec::new()))
            .collect();

        Ok(Rendered {
            entry: ManifestEntry {
                width,
                height,
                base: base.key.clone(),
                variants,
                blur_data_url,
                placeholder: true,
            },
            files,
        })
    }
}

/// Run a codec operation on the blocking pool, tagging failures with the
/// source path, the operation and the target width.
async fn run_blocking<T, F>(path: &Path, operation: &str, width: u32, f: F) -> PipelineResult<T>
where
    F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("Task join error: {e}"))
        .and_then(|result| result.map_err(|e| e.0))
        .map_err(|message| PipelineError::Encode {
            path: path.to_path_buf(),
            format: operation.to_string(),
            width,
            message,
        })
}

/// Write encoded files, creating directories as needed.
///
/// Each file is staged as a `.partial` sibling and renamed into place only
/// after every file is staged. Any failure removes the staged files and those
/// already renamed, so a failed source leaves no derivatives behind.
async fn write_files(files: &[(PathBuf, Vec<u8>)]) -> PipelineResult<usize> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let partial = partial_path(path);
        if let Err(e) = stage(path, &partial, bytes).await {
            staged.push(partial);
            remove_quietly(&staged).await;
            return Err(e);
        }
        staged.push(partial);
    }

    for (i, ((path, bytes), partial)) in files.iter().zip(&staged).enumerate() {
        if let Err(e) = tokio::fs::rename(partial, path).await {
            remove_quietly(&staged[i..]).await;
            let renamed: Vec<PathBuf> = files[..i].iter().map(|(p, _)| p.clone()).collect();
            remove_quietly(&renamed).await;
            return Err(PipelineError::Write {
                path: path.clone(),
                message: e.to_string(),
            });
        }
        tracing::debug!("Wrote {:?} ({} bytes)", path, bytes.len());
    }
    Ok(files.len())
}

async fn stage(path: &Path, partial: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let write_error = |e: std::io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(partial, bytes).await.map_err(write_error)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

async fn remove_quietly(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SiteLayout;
    use crate::pipeline::RasterCodec;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Site {
        _dir: tempfile::TempDir,
        layout: SiteLayout,
    }

    fn site() -> Site {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new(
            dir.path().join("photos"),
            dir.path().join("public/images"),
            dir.path().join("public"),
            "manifest.json",
        )
        .unwrap();
        std::fs::create_dir_all(layout.source_root()).unwrap();
        Site { _dir: dir, layout }
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.derivatives.target_widths = vec![16, 24, 32];
        config.derivatives.max_full_width = 32;
        config.derivatives.formats = vec![DerivativeFormat::Jpeg, DerivativeFormat::Webp];
        config.blur.width = 8;
        config
    }

    fn write_photo(path: &Path, width: u32, height: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 90]));
        DynamicImage::ImageRgb8(img)
            .save_with_format(path, ImageFormat::Jpeg)
            .unwrap();
    }

    fn write_corrupt_png(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H']);
        std::fs::write(path, bytes).unwrap();
    }

    fn dims(path: &Path) -> (u32, u32) {
        image::open(path).unwrap().dimensions()
    }

    /// Delegates to the real codec but fails every AVIF encode.
    struct NoAvifCodec {
        inner: RasterCodec,
        encodes: AtomicUsize,
    }

    impl ImageCodec for NoAvifCodec {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
            self.inner.decode(bytes)
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: DerivativeFormat,
            quality: u8,
        ) -> Result<Vec<u8>, CodecError> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            if format == DerivativeFormat::Avif {
                return Err(CodecError("avif disabled".to_string()));
            }
            self.inner.encode(image, format, quality)
        }
    }

    #[tokio::test]
    async fn test_valid_source_writes_full_set() {
        let site = site();
        let src = site.layout.source_root().join("travel/photo.jpg");
        write_photo(&src, 48, 32);

        let processor = DerivativeProcessor::new(&small_config(), Arc::new(RasterCodec::default()));
        let base = site.layout.derivative_base(&src);
        let result = processor.process(&base).await;

        assert_eq!(result.status, FileStatus::Written);
        // 3 widths x 2 formats + 1 full per format
        assert_eq!(result.files_written, 8);

        let out = site.layout.output_root().join("travel");
        for width in [16, 24, 32] {
            for ext in ["jpg", "webp"] {
                let path = out.join(format!("photo-{width}.{ext}"));
                assert!(std::fs::metadata(&path).unwrap().len() > 0);
                assert_eq!(dims(&path).0, width);
            }
        }
        assert_eq!(dims(&out.join("photo.jpg")), (32, 21));

        let entry = result.entry.unwrap();
        assert_eq!((entry.width, entry.height), (48, 32));
        assert_eq!(entry.base, "images/travel/photo");
        assert_eq!(entry.candidates(DerivativeFormat::Webp).len(), 3);
        assert_eq!(
            entry.candidates(DerivativeFormat::Jpeg)[0].path,
            "images/travel/photo-16.jpg"
        );
        assert!(entry.blur_data_url.starts_with("data:image/jpeg;base64,"));
        assert!(!entry.placeholder);
    }

    #[tokio::test]
    async fn test_narrow_source_is_not_upscaled() {
        let site = site();
        let src = site.layout.source_root().join("narrow.jpg");
        write_photo(&src, 20, 20);

        let processor = DerivativeProcessor::new(&small_config(), Arc::new(RasterCodec::default()));
        let result = processor.process(&site.layout.derivative_base(&src)).await;
        let entry = result.entry.unwrap();

        let widths: Vec<u32> = entry
            .candidates(DerivativeFormat::Jpeg)
            .iter()
            .map(|c| c.width)
            .collect();
        assert_eq!(widths, vec![16, 20]);

        let out = site.layout.output_root();
        assert!(!out.join("narrow-24.jpg").exists());
        assert_eq!(dims(&out.join("narrow-20.webp")), (20, 20));
        assert_eq!(dims(&out.join("narrow.jpg")), (20, 20));
    }

    #[tokio::test]
    async fn test_corrupt_source_fail_policy_writes_nothing() {
        let site = site();
        let src = site.layout.source_root().join("corrupt.png");
        write_corrupt_png(&src);

        let processor = DerivativeProcessor::new(&small_config(), Arc::new(RasterCodec::default()));
        let result = processor.process(&site.layout.derivative_base(&src)).await;

        assert_eq!(result.status, FileStatus::Failed);
        assert!(result.entry.is_none());
        assert!(result.error.unwrap().contains("corrupt.png"));
        assert!(!site.layout.output_root().join("corrupt.jpg").exists());
        assert!(!site.layout.output_root().join("corrupt.webp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_source_placeholder_policy() {
        let site = site();
        let src = site.layout.source_root().join("corrupt.png");
        write_corrupt_png(&src);

        let mut config = small_config();
        config.fallback.on_invalid_source = InvalidSourcePolicy::Placeholder;
        let processor = DerivativeProcessor::new(&config, Arc::new(RasterCodec::default()));
        let result = processor.process(&site.layout.derivative_base(&src)).await;

        assert_eq!(result.status, FileStatus::Placeholder);
        assert_eq!(result.files_written, 2);

        let out = site.layout.output_root();
        assert_eq!(dims(&out.join("corrupt.jpg")), (8, 8));
        assert_eq!(dims(&out.join("corrupt.webp")), (8, 8));
        assert!(!out.join("corrupt-16.jpg").exists());

        let entry = result.entry.unwrap();
        assert!(entry.placeholder);
        assert_eq!((entry.width, entry.height), (8, 8));
        assert!(entry.candidates(DerivativeFormat::Jpeg).is_empty());
    }

    #[tokio::test]
    async fn test_encode_failure_leaves_no_partial_output() {
        let site = site();
        let src = site.layout.source_root().join("photo.jpg");
        write_photo(&src, 48, 32);

        let mut config = small_config();
        config.derivatives.formats = vec![DerivativeFormat::Avif, DerivativeFormat::Jpeg];
        let codec = Arc::new(NoAvifCodec {
            inner: RasterCodec::default(),
            encodes: AtomicUsize::new(0),
        });
        let processor = DerivativeProcessor::new(&config, codec.clone());
        let result = processor.process(&site.layout.derivative_base(&src)).await;

        assert_eq!(result.status, FileStatus::Failed);
        assert!(result.error.unwrap().contains("avif"));
        assert!(codec.encodes.load(Ordering::SeqCst) > 0);
        assert!(!site.layout.output_root().join("photo-16.jpg").exists());
        assert!(!site.layout.output_root().join("photo.jpg").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_not_placeholdered() {
        let site = site();
        let src = site.layout.source_root().join("photo.jpg");
        write_photo(&src, 48, 32);
        // A file where the output directory should be
        std::fs::create_dir_all(site.layout.output_root()).unwrap();
        std::fs::write(site.layout.output_root().join("blocked"), b"x").unwrap();
        let src_blocked = site.layout.source_root().join("blocked/photo.jpg");
        write_photo(&src_blocked, 48, 32);

        let mut config = small_config();
        config.fallback.on_invalid_source = InvalidSourcePolicy::Placeholder;
        let processor = DerivativeProcessor::new(&config, Arc::new(RasterCodec::default()));
        let result = processor
            .process(&site.layout.derivative_base(&src_blocked))
            .await;

        assert_eq!(result.status, FileStatus::Failed);
        assert!(result.error.unwrap().contains("Failed to write"));
    }

    #[tokio::test]
    async fn test_failed_write_removes_earlier_derivatives() {
        let site = site();
        let src = site.layout.source_root().join("photo.jpg");
        write_photo(&src, 48, 32);
        // A directory where the third derivative should go
        let out = site.layout.output_root();
        std::fs::create_dir_all(out.join("photo-32.jpg")).unwrap();

        let processor = DerivativeProcessor::new(&small_config(), Arc::new(RasterCodec::default()));
        let result = processor.process(&site.layout.derivative_base(&src)).await;

        assert_eq!(result.status, FileStatus::Failed);
        assert_eq!(result.files_written, 0);
        assert!(!out.join("photo-16.jpg").exists());
        assert!(!out.join("photo-24.jpg").exists());
        assert!(!out.join("photo.webp").exists());

        let leftovers: Vec<_> = std::fs::read_dir(out)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "photo-32.jpg")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn test_partial_path_is_sibling() {
        assert_eq!(
            partial_path(Path::new("/out/a/photo-960.webp")),
            PathBuf::from("/out/a/photo-960.webp.partial")
        );
    }
}
