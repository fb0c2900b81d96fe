//! 上传编排：平铺上传每个文件一个任务，文件夹上传使用固定数量的工作者。

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::error::Error as StdError;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::staging::{temp_file_in, write_atomically};
use super::{Drive, DriveError, PathGuard, display_path, ensure_dir};

/// A received file, spooled to disk and waiting to be written.
///
/// The spool file is removed when the upload is dropped, whether or not it
/// was saved.
#[derive(Debug)]
pub struct PendingUpload {
    /// Client-supplied name; may carry folder segments for folder uploads.
    pub name: String,
    pub size: u64,
    spool: TempPath,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    fn saved(name: String, path: &Path, size: u64) -> Self {
        Self {
            name,
            path: Some(display_path(path)),
            size: Some(size),
            error: None,
        }
    }

    fn failed(name: String, error: impl ToString) -> Self {
        Self {
            name,
            path: None,
            size: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Itemized outcomes of a batch plus the aggregate failure flag.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
    pub all_failed: bool,
}

impl UploadReport {
    fn new(outcomes: Vec<UploadOutcome>) -> Self {
        let all_failed = !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_success());
        Self {
            outcomes,
            all_failed,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

impl Drive {
    /// 把客户端上传流逐块写入暂存文件，内存中只保留当前块。
    pub async fn spool_upload<S, E>(
        &self,
        name: impl Into<String>,
        body: S,
    ) -> Result<PendingUpload, DriveError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let name = name.into();
        let dir = &self.config.spool_dir;
        fs::create_dir_all(dir)
            .await
            .map_err(|err| DriveError::io("create spool directory", dir, err))?;
        let (mut file, spool) = temp_file_in(dir, ".vault-upload-".to_string()).await?;

        let mut body = std::pin::pin!(body);
        let mut size: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| DriveError::UploadInterrupted {
                name: name.clone(),
                source: io::Error::other(err),
            })?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk)
                .await
                .map_err(|err| DriveError::io("spool upload", &spool, err))?;
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|err| DriveError::io("spool upload", &spool, err))?;

        debug!(name, size, "upload spooled");
        Ok(PendingUpload { name, size, spool })
    }

    /// 平铺上传：每个文件一个任务，结果顺序与提交顺序一致。
    pub async fn upload_flat(
        &self,
        dest: &Path,
        files: Vec<PendingUpload>,
        overwrite: bool,
    ) -> Result<UploadReport, DriveError> {
        let dest = self.prepare_destination(dest, &files).await?;
        info!(dest = %dest.display(), count = files.len(), overwrite, "flat upload");

        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let name = file.name.clone();
                let guard = self.guard.clone();
                let dest = dest.clone();
                let handle =
                    tokio::spawn(async move { save_flat(&guard, &dest, file, overwrite).await });
                (name, handle)
            })
            .collect();

        // Slot i belongs to the i-th submitted file.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|err| {
                warn!(name, error = %err, "upload task failed");
                UploadOutcome::failed(name, format!("upload task failed: {err}"))
            });
            outcomes.push(outcome);
        }

        Ok(finish(&dest, outcomes))
    }

    /// 文件夹上传：保留相对路径，由固定数量的工作者并发写入，结果按完成顺序返回。
    pub async fn upload_folder(
        &self,
        dest: &Path,
        files: Vec<PendingUpload>,
        overwrite: bool,
    ) -> Result<UploadReport, DriveError> {
        let dest = self.prepare_destination(dest, &files).await?;
        let total = files.len();
        let workers = self.config.upload_workers.clamp(1, total);
        info!(dest = %dest.display(), count = total, workers, overwrite, "folder upload");

        let (job_tx, job_rx) = mpsc::channel::<PendingUpload>(total);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (done_tx, mut done_rx) = mpsc::channel::<UploadOutcome>(total);

        for worker in 0..workers {
            let jobs = job_rx.clone();
            let done = done_tx.clone();
            let guard = self.guard.clone();
            let dest = dest.clone();
            tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(file) = next else {
                        break;
                    };
                    let outcome = save_folder_entry(&guard, &dest, file, overwrite).await;
                    if done.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!(worker, "upload worker finished");
            });
        }
        drop(done_tx);

        for file in files {
            job_tx
                .send(file)
                .await
                .map_err(|_| DriveError::Internal("upload workers stopped".into()))?;
        }
        drop(job_tx);

        let mut outcomes = Vec::with_capacity(total);
        for _ in 0..total {
            match done_rx.recv().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        if outcomes.len() != total {
            warn!(
                expected = total,
                received = outcomes.len(),
                "upload workers exited early"
            );
            return Err(DriveError::Internal(format!(
                "upload workers exited early: {} of {total} files reported",
                outcomes.len()
            )));
        }

        Ok(finish(&dest, outcomes))
    }

    async fn prepare_destination(
        &self,
        dest: &Path,
        files: &[PendingUpload],
    ) -> Result<PathBuf, DriveError> {
        if files.is_empty() {
            return Err(DriveError::InvalidArgument("no files provided".into()));
        }
        ensure_dir(&self.guard, dest).await
    }
}

fn finish(dest: &Path, outcomes: Vec<UploadOutcome>) -> UploadReport {
    let report = UploadReport::new(outcomes);
    if report.all_failed {
        warn!(dest = %dest.display(), count = report.outcomes.len(), "all uploads failed");
    } else {
        info!(
            dest = %dest.display(),
            succeeded = report.succeeded(),
            total = report.outcomes.len(),
            "upload finished"
        );
    }
    report
}

async fn save_flat(
    guard: &PathGuard,
    dest: &Path,
    file: PendingUpload,
    overwrite: bool,
) -> UploadOutcome {
    let Some(base_name) = flat_file_name(&file.name) else {
        return UploadOutcome::failed(
            file.name,
            DriveError::InvalidArgument("invalid file name".into()),
        );
    };
    let target = dest.join(base_name);
    match save_upload(guard, &target, &file, overwrite).await {
        Ok((path, written)) => UploadOutcome::saved(file.name, &path, written),
        Err(err) => {
            debug!(name = file.name, error = %err, "upload failed");
            UploadOutcome::failed(file.name, err)
        }
    }
}

async fn save_folder_entry(
    guard: &PathGuard,
    dest: &Path,
    file: PendingUpload,
    overwrite: bool,
) -> UploadOutcome {
    let relative = match relative_upload_path(&file.name) {
        Ok(relative) => relative,
        Err(err) => return UploadOutcome::failed(file.name, err),
    };
    let target = dest.join(relative);
    match save_upload(guard, &target, &file, overwrite).await {
        Ok((path, written)) => UploadOutcome::saved(file.name, &path, written),
        Err(err) => {
            debug!(name = file.name, error = %err, "upload failed");
            UploadOutcome::failed(file.name, err)
        }
    }
}

/// Moves one spooled upload to `target`, creating the parent on demand.
///
/// Content goes through a sibling temp file that is persisted only once
/// fully written; without `overwrite` the persist step refuses to replace
/// an existing file.
async fn save_upload(
    guard: &PathGuard,
    target: &Path,
    file: &PendingUpload,
    overwrite: bool,
) -> Result<(PathBuf, u64), DriveError> {
    let target = guard.check(target)?;
    if let Some(parent) = target.parent() {
        ensure_dir(guard, parent).await?;
    }
    if !overwrite && fs::try_exists(&target).await.unwrap_or(false) {
        return Err(DriveError::AlreadyExists(target));
    }

    let mut source = File::open(&file.spool)
        .await
        .map_err(|err| DriveError::io("read spooled upload", &file.spool, err))?;
    let written = write_atomically(&target, &mut source, overwrite).await?;
    Ok((target, written))
}

/// Final segment of a client file name; folder parts are dropped.
fn flat_file_name(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let base = normalized.rsplit('/').next()?.trim();
    single_segment(base).map(str::to_string)
}

/// Accepts `value` only when it is one plain path segment.
fn single_segment(value: &str) -> Option<&str> {
    if cfg!(windows) && value.contains(':') {
        return None;
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(value),
        _ => None,
    }
}

/// Validates a folder-preserving relative name such as `a/b/c.txt`.
fn relative_upload_path(name: &str) -> Result<PathBuf, DriveError> {
    let normalized = name.trim().replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');
    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_string_lossy();
                let Some(segment) = single_segment(&segment) else {
                    return Err(DriveError::InvalidArgument(format!(
                        "invalid relative path: {name}"
                    )));
                };
                relative.push(segment);
            }
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DriveError::InvalidArgument(format!(
                    "invalid relative path: {name}"
                )));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(DriveError::InvalidArgument("invalid file name".into()));
    }
    Ok(relative)
}
