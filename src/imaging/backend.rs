//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline needs:
//! identify (dimensions only), thumbnail (square JPEG), and transcode (lossy
//! WebP with EXIF carried over).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! [`MockBackend`](tests::MockBackend) below, which records calls instead of
//! touching pixels.

use super::params::{ThumbnailParams, TranscodeParams};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
}

impl BackendError {
    pub fn decode(path: &Path, reason: impl ToString) -> Self {
        BackendError::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(path: &Path, reason: impl ToString) -> Self {
        BackendError::Encode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// What a transcode produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Size of the written file.
    pub bytes: u64,
    /// Whether source EXIF was embedded in the output.
    pub exif: bool,
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: batch stages call them from rayon workers.
/// Outputs are written whole or not at all.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Center-crop to a square, resize, encode JPEG. Returns bytes written.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<u64, BackendError>;

    /// Decode any registered format and re-encode as lossy WebP.
    fn transcode(&self, params: &TranscodeParams) -> Result<TranscodeReport, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{Quality, WebpMethod};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Bytes the mock writes for every output.
    pub const MOCK_OUTPUT: &[u8] = b"mock-image-bytes";

    /// Mock backend that records operations instead of executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Dimensions are looked up by file name first, then popped from
    /// `identify_results`. Files named in `fail_on` fail every operation with
    /// a decode error. Thumbnail and transcode write [`MOCK_OUTPUT`] to the
    /// output path when its directory exists.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub dimensions_by_name: Mutex<HashMap<String, Dimensions>>,
        pub fail_on: Mutex<HashSet<String>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Thumbnail {
            source: String,
            output: String,
            size: u32,
            quality: u32,
        },
        Transcode {
            source: String,
            output: String,
            quality: u32,
            method: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        /// Dimensions keyed by file name, for order-independent lookups.
        pub fn with_named_dimensions(entries: &[(&str, u32, u32)]) -> Self {
            let map = entries
                .iter()
                .map(|&(name, width, height)| (name.to_string(), Dimensions { width, height }))
                .collect();
            Self {
                dimensions_by_name: Mutex::new(map),
                ..Self::default()
            }
        }

        pub fn failing_on(self, name: &str) -> Self {
            self.fail_on.lock().unwrap().insert(name.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn check_failure(&self, path: &Path) -> Result<(), BackendError> {
            let name = file_name(path);
            if self.fail_on.lock().unwrap().contains(&name) {
                return Err(BackendError::decode(path, "mock failure"));
            }
            Ok(())
        }

        fn write_output(path: &Path) -> u64 {
            let _ = std::fs::write(path, MOCK_OUTPUT);
            MOCK_OUTPUT.len() as u64
        }
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            self.check_failure(path)?;

            if let Some(dims) = self.dimensions_by_name.lock().unwrap().get(&file_name(path)) {
                return Ok(*dims);
            }
            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::decode(path, "no mock dimensions"))
        }

        fn thumbnail(&self, params: &ThumbnailParams) -> Result<u64, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Thumbnail {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                size: params.size,
                quality: params.quality.value(),
            });
            self.check_failure(&params.source)?;
            Ok(Self::write_output(&params.output))
        }

        fn transcode(&self, params: &TranscodeParams) -> Result<TranscodeReport, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Transcode {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                quality: params.quality.value(),
                method: params.method.value(),
            });
            self.check_failure(&params.source)?;
            Ok(TranscodeReport {
                bytes: Self::write_output(&params.output),
                exif: false,
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_named_dimensions_win_over_queue() {
        let backend = MockBackend::with_named_dimensions(&[("cat.png", 300, 400)]);
        let dims = backend.identify(Path::new("/a/cat.png")).unwrap();
        assert_eq!(dims, Dimensions { width: 300, height: 400 });
        assert!(backend.identify(Path::new("/a/dog.png")).is_err());
    }

    #[test]
    fn mock_fails_on_named_file() {
        let backend = MockBackend::with_named_dimensions(&[("bad.jpg", 1, 2)]).failing_on("bad.jpg");
        let err = backend.identify(Path::new("/a/bad.jpg")).unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[test]
    fn mock_records_thumbnail() {
        let backend = MockBackend::new();
        let bytes = backend
            .thumbnail(&ThumbnailParams {
                source: "/source.jpg".into(),
                output: "/nonexistent-dir/thumb.jpg".into(),
                size: 200,
                quality: Quality::new(85),
            })
            .unwrap();
        assert_eq!(bytes, MOCK_OUTPUT.len() as u64);

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Thumbnail {
                size: 200,
                quality: 85,
                ..
            }
        ));
    }

    #[test]
    fn mock_records_transcode() {
        let backend = MockBackend::new();
        backend
            .transcode(&TranscodeParams {
                source: "/a/IMG.heic".into(),
                output: "/nonexistent-dir/IMG.webp".into(),
                quality: Quality::new(85),
                method: WebpMethod::new(6),
            })
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Transcode {
                source: "/a/IMG.heic".into(),
                output: "/nonexistent-dir/IMG.webp".into(),
                quality: 85,
                method: 6,
            }]
        );
    }

    #[test]
    fn backend_error_messages_name_the_file() {
        let err = BackendError::decode(Path::new("/a/b.heic"), "bad header");
        assert_eq!(err.to_string(), "Failed to decode /a/b.heic: bad header");
    }
}
