//! 临时文件与原子落盘：上传内容先写入临时文件，完成后再替换目标。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};

use super::DriveError;

/// Creates a hidden temporary file in `dir`.
///
/// The returned [`TempPath`] deletes the file when dropped, so every early
/// return leaves nothing behind.
pub(crate) async fn temp_file_in(dir: &Path, prefix: String) -> Result<(File, TempPath), DriveError> {
    let owned = dir.to_path_buf();
    let created = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".part")
            .tempfile_in(&owned)
    })
    .await
    .map_err(|err| DriveError::Internal(format!("temp file task failed: {err}")))?
    .map_err(|err| DriveError::io("create temporary file in", dir, err))?;

    let (file, path) = NamedTempFile::into_parts(created);
    Ok((File::from_std(file), path))
}

/// 写入同目录临时文件，成功后原子地移动到 `target`。
///
/// Without `overwrite` the final step refuses to replace an existing file,
/// so two writers racing for one name leave exactly one winner. The target
/// never holds partially written content.
pub(crate) async fn write_atomically<R>(
    target: &Path,
    reader: &mut R,
    overwrite: bool,
) -> Result<u64, DriveError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let parent = target
        .parent()
        .ok_or_else(|| DriveError::InvalidArgument(format!("invalid target {}", target.display())))?;
    let base = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let (mut file, temp_path) = temp_file_in(parent, format!(".{base}.")).await?;

    let written = tokio::io::copy(reader, &mut file)
        .await
        .map_err(|err| DriveError::io("write file", target, err))?;
    file.flush()
        .await
        .map_err(|err| DriveError::io("write file", target, err))?;
    file.sync_all()
        .await
        .map_err(|err| DriveError::io("sync file", target, err))?;
    drop(file);

    persist(temp_path, target, overwrite).await?;
    Ok(written)
}

async fn persist(temp_path: TempPath, target: &Path, overwrite: bool) -> Result<(), DriveError> {
    let dest: PathBuf = target.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        if overwrite {
            temp_path.persist(&dest)
        } else {
            temp_path.persist_noclobber(&dest)
        }
    })
    .await
    .map_err(|err| DriveError::Internal(format!("persist task failed: {err}")))?;

    // On failure the temp path comes back inside the error and is removed on drop.
    result.map_err(|err| {
        if err.error.kind() == ErrorKind::AlreadyExists {
            DriveError::AlreadyExists(target.to_path_buf())
        } else {
            DriveError::io("replace file", target, err.error)
        }
    })
}
