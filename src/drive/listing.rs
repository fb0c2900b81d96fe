//! 目录列表：只读取直接子项，支持协作式取消。

use std::path::Path;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Drive, DriveError, EntryKind, FileRecord, display_path, modified_time};

impl Drive {
    /// 列出目录的直接子项。
    ///
    /// Cancellation is checked before starting and around the skip filter for
    /// every entry; a cancelled listing returns [`DriveError::Cancelled`] and
    /// drops whatever was collected so far. Order follows the directory read
    /// order.
    pub async fn list(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileRecord>, DriveError> {
        self.list_observed(path, cancel, |_| {}).await
    }

    /// [`Drive::list`] with a callback invoked for each raw entry name.
    async fn list_observed(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        mut observe: impl FnMut(&str),
    ) -> Result<Vec<FileRecord>, DriveError> {
        ensure_active(cancel)?;
        let target = self.guard.check(path)?;
        let metadata = fs::metadata(&target)
            .await
            .map_err(|err| DriveError::stat(&target, err))?;
        if !metadata.is_dir() {
            return Err(DriveError::InvalidArgument(format!(
                "path {} is not a directory",
                target.display()
            )));
        }

        let mut dir = fs::read_dir(&target)
            .await
            .map_err(|err| DriveError::io("read directory", &target, err))?;
        let mut records = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| DriveError::io("read directory", &target, err))?
        {
            ensure_active(cancel)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            observe(&name);
            if self.guard.should_skip(&name) {
                debug!(name, "skipping entry");
                continue;
            }
            ensure_active(cancel)?;

            let child = target.join(&name);
            let metadata = entry
                .metadata()
                .await
                .map_err(|err| DriveError::io("stat entry", &child, err))?;
            let kind = if metadata.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            records.push(FileRecord {
                name,
                path: display_path(&child),
                kind,
                size: match kind {
                    EntryKind::Folder => 0,
                    EntryKind::File => metadata.len(),
                },
                modified: modified_time(&metadata),
            });
        }

        info!(path = %target.display(), count = records.len(), "list directory");
        Ok(records)
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), DriveError> {
    if cancel.is_cancelled() {
        return Err(DriveError::Cancelled);
    }
    Ok(())
}
