//! Still capture: file naming and the background worker that writes JPEGs

mod naming;
mod worker;

pub use naming::CaptureNamer;
pub use worker::{CaptureWorker, PendingCapture};

use std::fmt;
use std::path::{Path, PathBuf};

/// A photo written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFile {
    path: PathBuf,
    timestamp_millis: i64,
}

impl CapturedFile {
    pub fn new(path: PathBuf, timestamp_millis: i64) -> Self {
        Self {
            path,
            timestamp_millis,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// No still could be obtained from the camera
    CaptureFailed,
    Encoding,
    FileIo,
    /// The background worker is gone
    WorkerStopped,
}

impl CaptureErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            CaptureErrorKind::CaptureFailed => "CAPTURE_FAILED",
            CaptureErrorKind::Encoding => "ENCODING_ERROR",
            CaptureErrorKind::FileIo => "FILE_IO_ERROR",
            CaptureErrorKind::WorkerStopped => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CaptureError {
    kind: CaptureErrorKind,
    message: String,
}

impl CaptureError {
    pub fn new(kind: CaptureErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CaptureErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
