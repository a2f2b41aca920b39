use std::path::{Path, PathBuf};

/// Hands out `<epoch-millis>.jpg` destinations
///
/// Timestamps strictly increase within one namer, even if the wall clock
/// stalls or steps back, so successive captures never share a file.
#[derive(Debug, Default)]
pub struct CaptureNamer {
    last_millis: Option<i64>,
}

impl CaptureNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination for a capture taken now
    pub fn next_path(&mut self, dir: &Path) -> (PathBuf, i64) {
        self.next_path_at(dir, chrono::Utc::now().timestamp_millis())
    }

    pub fn next_path_at(&mut self, dir: &Path, now_millis: i64) -> (PathBuf, i64) {
        let millis = match self.last_millis {
            Some(last) if now_millis <= last => last + 1,
            _ => now_millis,
        };
        self.last_millis = Some(millis);
        (dir.join(format!("{}.jpg", millis)), millis)
    }
}
