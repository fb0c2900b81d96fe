//! Local filesystem drive: root discovery, listing, content access and uploads.
//!
//! Every operation runs its input path through [`PathGuard`] before touching
//! the filesystem and works on the cleaned absolute path the guard returns.
//! Nothing is kept between calls; a [`Drive`] only carries its policy and
//! tuning knobs.

mod content;
mod guard;
mod listing;
mod roots;
mod staging;
mod upload;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::config::{DEFAULT_LIST_TIMEOUT_SECS, DEFAULT_SPOOL_DIR_NAME, DEFAULT_UPLOAD_WORKERS};

pub use content::{ContentHandle, ContentMode};
pub use guard::PathGuard;

/// Errors produced by drive operations.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("access to path {} is not allowed", .0.display())]
    AccessDenied(PathBuf),

    #[error("path {} does not exist or is not accessible", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to {context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("upload of {name} was interrupted: {source}")]
    UploadInterrupted {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("all uploads failed")]
    AllUploadsFailed,

    #[error("{0}")]
    Internal(String),
}

impl DriveError {
    pub(crate) fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        DriveError::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stat failures all surface as "not found or not accessible".
    pub(crate) fn stat(path: &Path, source: io::Error) -> Self {
        DriveError::NotFound {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Tuning knobs for a [`Drive`].
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub upload_workers: usize,
    pub list_timeout: Duration,
    /// Where multipart parts are staged before they are saved.
    pub spool_dir: PathBuf,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            upload_workers: DEFAULT_UPLOAD_WORKERS,
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
            spool_dir: std::env::temp_dir().join(DEFAULT_SPOOL_DIR_NAME),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Drive {
    guard: Arc<PathGuard>,
    config: DriveConfig,
}

impl Drive {
    pub fn new(guard: PathGuard, config: DriveConfig) -> Self {
        Self {
            guard: Arc::new(guard),
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// 创建目录（含父级），目录已存在时视为成功。
    pub async fn create_folder(&self, path: &Path) -> Result<PathBuf, DriveError> {
        let target = self.guard.check(path)?;
        fs::create_dir_all(&target)
            .await
            .map_err(|err| DriveError::io("create directory", &target, err))?;
        info!(path = %target.display(), "folder created");
        Ok(target)
    }
}

/// A browsable top-level location.
#[derive(Debug, Clone, Serialize)]
pub struct RootEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

pub(crate) fn modified_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Renders a path with forward slashes, the form returned to clients.
pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Ensures `path` is a directory, creating it (and its parents) when absent.
pub(crate) async fn ensure_dir(guard: &PathGuard, path: &Path) -> Result<PathBuf, DriveError> {
    let target = guard.check(path)?;
    match fs::metadata(&target).await {
        Ok(metadata) if metadata.is_dir() => Ok(target),
        Ok(_) => Err(DriveError::InvalidArgument(format!(
            "path {} is not a directory",
            target.display()
        ))),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(&target)
                .await
                .map_err(|err| DriveError::io("create directory", &target, err))?;
            Ok(target)
        }
        Err(err) => Err(DriveError::stat(&target, err)),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_drive;
    use super::*;

    #[tokio::test]
    async fn create_folder_builds_nested_tree() {
        let (temp, drive) = make_drive();
        let target = temp.path().join("a/b/c");

        drive.create_folder(&target).await.expect("create folder");
        assert!(target.is_dir());

        // 已存在时再次创建不报错
        drive.create_folder(&target).await.expect("create again");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn create_folder_rejects_denied_path() {
        let (_temp, drive) = make_drive();
        let result = drive.create_folder(Path::new("/etc/vault-drive-test")).await;

        assert!(matches!(result, Err(DriveError::AccessDenied(_))));
        assert!(!Path::new("/etc/vault-drive-test").exists());
    }

    #[tokio::test]
    async fn ensure_dir_rejects_regular_file() {
        let (temp, drive) = make_drive();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, b"x").expect("write file");

        let result = ensure_dir(&drive.guard, &file).await;
        assert!(matches!(result, Err(DriveError::InvalidArgument(_))));
    }
}
