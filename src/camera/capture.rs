//! One-shot still capture.

use crate::error::{Result, ShopAssistError};
use crate::exec::CommandExecutor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Takes a still photograph and returns where it was written.
#[async_trait]
pub trait StillCamera: Send + Sync {
    async fn take_photo(&self) -> Result<PathBuf>;
}

/// Still capture through `ffmpeg`'s V4L2 input, one frame per call.
pub struct FfmpegCamera<E: CommandExecutor> {
    executor: E,
    device: String,
    output_dir: PathBuf,
    sequence: AtomicU64,
}

impl<E: CommandExecutor> FfmpegCamera<E> {
    pub fn new(executor: E, device: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            device: device.into(),
            output_dir: output_dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.output_dir.join(format!("photo-{millis}-{seq}.jpg"))
    }

    fn args(&self, path: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
            "-i".to_string(),
            self.device.clone(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-y".to_string(),
            path.display().to_string(),
        ]
    }
}

#[async_trait]
impl<E: CommandExecutor> StillCamera for FfmpegCamera<E> {
    async fn take_photo(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ShopAssistError::Capture {
                message: format!(
                    "cannot create capture directory {}: {e}",
                    self.output_dir.display()
                ),
            })?;

        let path = self.next_path();
        self.executor
            .execute("ffmpeg", &self.args(&path))
            .await
            .map_err(|e| ShopAssistError::Capture {
                message: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), "captured image");
        Ok(path)
    }
}

/// Camera that returns a fixed path, or fails on demand.
#[derive(Debug, Clone)]
pub struct MockCamera {
    path: PathBuf,
    should_fail: bool,
}

impl MockCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            should_fail: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl StillCamera for MockCamera {
    async fn take_photo(&self) -> Result<PathBuf> {
        if self.should_fail {
            Err(ShopAssistError::Capture {
                message: "mock capture failure".to_string(),
            })
        } else {
            Ok(self.path.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MockCommandExecutor;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ffmpeg_camera_invokes_ffmpeg_with_device() {
        let dir = TempDir::new().unwrap();
        let camera = FfmpegCamera::new(MockCommandExecutor::new(), "/dev/video3", dir.path());

        let path = camera.take_photo().await.unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

        let calls = camera.executor.calls();
        assert_eq!(calls.len(), 1);
        let (command, args) = &calls[0];
        assert_eq!(command, "ffmpeg");
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/dev/video3"));
        assert_eq!(args.last().map(String::as_str), path.to_str());
    }

    #[tokio::test]
    async fn test_ffmpeg_camera_paths_are_unique() {
        let dir = TempDir::new().unwrap();
        let camera = FfmpegCamera::new(MockCommandExecutor::new(), "/dev/video0", dir.path());
        let first = camera.take_photo().await.unwrap();
        let second = camera.take_photo().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_ffmpeg_failure_maps_to_capture_error() {
        let dir = TempDir::new().unwrap();
        let executor = MockCommandExecutor::new().with_error(ShopAssistError::ToolNotFound {
            tool: "ffmpeg".to_string(),
        });
        let camera = FfmpegCamera::new(executor, "/dev/video0", dir.path());

        let err = camera.take_photo().await.unwrap_err();
        assert!(matches!(err, ShopAssistError::Capture { ref message } if message.contains("ffmpeg")));
    }

    #[tokio::test]
    async fn test_mock_camera() {
        assert_eq!(
            MockCamera::new("/tmp/x.jpg").take_photo().await.unwrap(),
            PathBuf::from("/tmp/x.jpg")
        );
        assert!(
            MockCamera::new("/tmp/x.jpg")
                .with_failure()
                .take_photo()
                .await
                .is_err()
        );
    }
}
