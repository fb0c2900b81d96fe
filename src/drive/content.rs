//! 打开文件供预览、流式播放或下载。

use mime_guess::Mime;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File};
use tracing::debug;

use super::{Drive, DriveError};
use crate::config::PREVIEW_RANGE_THRESHOLD;

/// How the opened content is going to be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentMode {
    /// Small files go out whole; large ones honor `Range`.
    Preview,
    Stream,
    Download,
}

/// An open file plus what the HTTP layer needs to serve it.
///
/// The handle owns the descriptor. Moving it into a response body ties the
/// descriptor's lifetime to the body, so it is closed once the body is
/// written or dropped.
#[derive(Debug)]
pub struct ContentHandle {
    pub file: File,
    pub size: u64,
    pub path: PathBuf,
    pub mime: Mime,
    pub range_required: bool,
    pub modified: Option<SystemTime>,
}

impl ContentHandle {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string())
    }
}

impl Drive {
    /// 打开文件并计算 MIME 与是否需要 Range 处理。
    pub async fn open(&self, path: &Path, mode: ContentMode) -> Result<ContentHandle, DriveError> {
        let target = self.guard.check(path)?;
        let metadata = fs::metadata(&target)
            .await
            .map_err(|err| DriveError::stat(&target, err))?;
        if metadata.is_dir() {
            return Err(DriveError::InvalidArgument(format!(
                "path {} is a directory",
                target.display()
            )));
        }

        let file = File::open(&target)
            .await
            .map_err(|err| DriveError::io("open file", &target, err))?;
        let size = metadata.len();
        let range_required = match mode {
            ContentMode::Preview => size >= PREVIEW_RANGE_THRESHOLD,
            ContentMode::Stream | ContentMode::Download => true,
        };
        let mime = detect_mime(&target);
        debug!(path = %target.display(), size, %mime, range_required, ?mode, "content opened");

        Ok(ContentHandle {
            file,
            size,
            path: target,
            mime,
            range_required,
            modified: metadata.modified().ok(),
        })
    }
}

/// MIME type from the lowercased extension, octet-stream when unknown.
pub fn detect_mime(path: &Path) -> Mime {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .and_then(|ext| mime_guess::from_ext(&ext).first())
        .unwrap_or(mime_guess::mime::APPLICATION_OCTET_STREAM)
}
