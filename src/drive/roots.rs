//! 可浏览根目录发现：Windows 盘符，POSIX 下的根、家目录与挂载点。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{Drive, DriveError, PathGuard, RootEntry, display_path, modified_time};

#[cfg(not(windows))]
const MOUNT_DIRS: &[&str] = &["/mnt", "/media"];

impl Drive {
    /// 返回所有可浏览的根目录条目。
    pub async fn roots(&self) -> Result<Vec<RootEntry>, DriveError> {
        let paths = locate_roots(&self.guard).await?;
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => metadata,
                Ok(_) => continue,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable root");
                    continue;
                }
            };
            entries.push(RootEntry {
                name: root_name(&path),
                path: display_path(&path),
                kind: "directory",
                size: 0,
                modified: modified_time(&metadata),
            });
        }
        info!(count = entries.len(), "discovered roots");
        Ok(entries)
    }
}

/// Discovers root paths for the current platform, guard-filtered and
/// deduplicated in first-seen order.
pub async fn locate_roots(guard: &PathGuard) -> Result<Vec<PathBuf>, DriveError> {
    let candidates = platform_roots(guard).await?;
    let mut roots = dedup_roots(candidates);
    roots.retain(|root| guard.is_safe(root));
    Ok(roots)
}

#[cfg(not(windows))]
async fn platform_roots(guard: &PathGuard) -> Result<Vec<PathBuf>, DriveError> {
    let mut roots = Vec::new();
    if let Ok(root) = guard.check(Path::new("/")) {
        roots.push(root);
    }
    if let Some(home) = dirs::home_dir()
        && let Ok(home) = guard.check(&home)
    {
        roots.push(home);
    }
    for mount_dir in MOUNT_DIRS {
        roots.extend(scan_mount_dir(guard, Path::new(mount_dir)).await);
    }
    Ok(roots)
}

/// 扫描挂载目录的一级子目录；目录不存在或不可读时返回空。
#[cfg(not(windows))]
async fn scan_mount_dir(guard: &PathGuard, dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Ok(path) = guard.check(&entry.path()) {
            found.push(path);
        }
    }
    found
}

#[cfg(windows)]
async fn platform_roots(guard: &PathGuard) -> Result<Vec<PathBuf>, DriveError> {
    let mut drives = tokio::task::spawn_blocking(logical_drive_strings)
        .await
        .map_err(|err| DriveError::Internal(format!("drive query task failed: {err}")))??;
    if drives.is_empty() {
        drives.push("C:/".to_string());
    }
    debug!(?drives, "logical drives");
    Ok(drives
        .iter()
        .filter_map(|drive| guard.check(Path::new(drive)).ok())
        .collect())
}

#[cfg(windows)]
fn logical_drive_strings() -> Result<Vec<String>, DriveError> {
    use windows::Win32::Storage::FileSystem::GetLogicalDriveStringsW;

    let mut buffer = [0u16; 256];
    let written = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;
    if written == 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(0) {
            return Ok(Vec::new());
        }
        return Err(drive_query_error(err));
    }
    if written > buffer.len() {
        return Err(DriveError::Internal(format!(
            "logical drive list needs {written} units, buffer holds {}",
            buffer.len()
        )));
    }
    Ok(parse_drive_strings(&buffer[..written]))
}

#[cfg_attr(not(windows), allow(dead_code))]
fn drive_query_error(err: std::io::Error) -> DriveError {
    DriveError::Internal(format!("failed to query logical drives: {err}"))
}

/// Splits a NUL-separated UTF-16 multi-string into drive roots with
/// forward slashes, e.g. `C:\` becomes `C:/`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_drive_strings(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|unit| *unit == 0)
        .filter(|segment| !segment.is_empty())
        .map(|segment| String::from_utf16_lossy(segment).replace('\\', "/"))
        .filter(|drive| !drive.is_empty())
        .collect()
}

fn dedup_roots(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|path| seen.insert(display_path(path)))
        .collect()
}

fn root_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => display_path(path),
    }
}
