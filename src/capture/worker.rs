use super::{CaptureError, CaptureErrorKind, CapturedFile};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

const JPEG_QUALITY: u8 = 92;

type CaptureResult = Result<CapturedFile, CaptureError>;

struct CaptureJob {
    frame: RgbImage,
    path: PathBuf,
    timestamp_millis: i64,
    reply: Sender<CaptureResult>,
}

/// Result of a capture that may still be in flight
pub struct PendingCapture {
    receiver: Receiver<CaptureResult>,
}

impl PendingCapture {
    /// A capture that is already settled
    pub fn resolved(result: CaptureResult) -> Self {
        let (reply, receiver) = mpsc::channel();
        // The receiver is alive, so the send cannot fail
        let _ = reply.send(result);
        Self { receiver }
    }

    /// Non-blocking poll. Returns `None` while the worker is still busy.
    pub fn try_take(&mut self) -> Option<CaptureResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_stopped())),
        }
    }

    /// Block until the capture settles
    pub fn wait(self) -> CaptureResult {
        self.receiver.recv().unwrap_or_else(|_| Err(worker_stopped()))
    }
}

fn worker_stopped() -> CaptureError {
    CaptureError::new(
        CaptureErrorKind::WorkerStopped,
        "capture worker stopped before finishing",
    )
}

/// Single background thread that encodes stills and writes them to disk
///
/// Jobs run in submission order. Dropping the worker lets queued jobs finish
/// and joins the thread.
pub struct CaptureWorker {
    jobs: Option<Sender<CaptureJob>>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn() -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<CaptureJob>();

        let handle = std::thread::Builder::new()
            .name("capture-worker".into())
            .spawn(move || {
                for job in queue {
                    let result = write_jpeg(&job.frame, &job.path)
                        .map(|()| CapturedFile::new(job.path.clone(), job.timestamp_millis));
                    if job.reply.send(result).is_err() {
                        tracing::debug!("Capture result for {} was not awaited", job.path.display());
                    }
                }
                tracing::debug!("Capture worker exiting");
            })?;

        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
        })
    }

    /// Queue `frame` to be written to `path`
    pub fn submit(&self, frame: RgbImage, path: PathBuf, timestamp_millis: i64) -> PendingCapture {
        let (reply, receiver) = mpsc::channel();
        let job = CaptureJob {
            frame,
            path,
            timestamp_millis,
            reply,
        };

        match &self.jobs {
            Some(jobs) => {
                if let Err(mpsc::SendError(job)) = jobs.send(job) {
                    let _ = job.reply.send(Err(worker_stopped()));
                }
            }
            None => {
                let _ = job.reply.send(Err(worker_stopped()));
            }
        }

        PendingCapture { receiver }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Capture worker panicked");
            }
        }
    }
}

fn write_jpeg(frame: &RgbImage, path: &Path) -> Result<(), CaptureError> {
    let _span = tracing::debug_span!("write_jpeg").entered();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .encode(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::new(CaptureErrorKind::Encoding, e.to_string()))?;

    std::fs::write(path, &buffer).map_err(|e| {
        CaptureError::new(
            CaptureErrorKind::FileIo,
            format!("failed to write {}: {}", path.display(), e),
        )
    })?;

    tracing::debug!("Wrote {} bytes to {}", buffer.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use image::Rgb;

    #[test]
    fn test_worker_writes_decodable_jpeg() {
        let dir = temp_dir();
        let path = dir.join("42.jpg");
        let worker = CaptureWorker::spawn().unwrap();

        let frame = RgbImage::from_pixel(16, 8, Rgb([200, 100, 50]));
        let file = worker.submit(frame, path.clone(), 42).wait().unwrap();

        assert_eq!(file.path(), path.as_path());
        assert_eq!(file.timestamp_millis(), 42);
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_unwritable_destination_reports_file_io() {
        let dir = temp_dir();
        let path = dir.join("missing").join("1.jpg");
        let worker = CaptureWorker::spawn().unwrap();

        let err = worker
            .submit(RgbImage::new(8, 8), path, 1)
            .wait()
            .unwrap_err();
        assert_eq!(err.kind(), CaptureErrorKind::FileIo);
    }

    #[test]
    fn test_resolved_pending_is_ready_immediately() {
        let err = CaptureError::new(CaptureErrorKind::CaptureFailed, "no camera bound");
        let mut pending = PendingCapture::resolved(Err(err.clone()));
        assert_eq!(pending.try_take(), Some(Err(err)));
    }
}
