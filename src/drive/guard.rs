//! 路径访问范围判定与列表噪声过滤。

use std::io;
use std::path::{Component, Path, PathBuf};

use super::DriveError;

#[cfg(windows)]
const DENIED_PREFIXES: &[&str] = &["C:/Windows", "C:/Program Files", "C:/Program Files (x86)"];

#[cfg(not(windows))]
const DENIED_PREFIXES: &[&str] = &["/etc", "/var", "/root", "/proc", "/sys"];

const SYSTEM_FOLDERS: &[&str] = &[
    "System Volume Information",
    "Recovery",
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "ProgramData",
    "Boot",
    "EFI",
];

/// Deny-list policy deciding which paths the API may touch.
///
/// Prefixes are compared case-insensitively, with `/` separators, against
/// the absolute lexically cleaned form of the candidate path. A prefix
/// covers itself and everything nested under it.
#[derive(Clone, Debug)]
pub struct PathGuard {
    denied: Vec<String>,
}

impl PathGuard {
    /// 当前平台的默认敏感目录列表。
    pub fn platform_default() -> Self {
        Self::new(DENIED_PREFIXES.iter().copied())
    }

    pub fn new<I, S>(denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let denied = denied
            .into_iter()
            .map(|prefix| normalize_for_compare(prefix.as_ref()))
            .filter(|prefix| !prefix.is_empty())
            .collect();
        Self { denied }
    }

    pub fn is_safe(&self, path: &Path) -> bool {
        match absolute_clean(path) {
            Ok(clean) => self.allows(&clean),
            Err(_) => false,
        }
    }

    /// 校验路径并返回清理后的绝对路径。
    pub fn check(&self, path: &Path) -> Result<PathBuf, DriveError> {
        let clean =
            absolute_clean(path).map_err(|_| DriveError::AccessDenied(path.to_path_buf()))?;
        if !self.allows(&clean) {
            return Err(DriveError::AccessDenied(path.to_path_buf()));
        }
        Ok(clean)
    }

    /// 列表时需要隐藏的条目：点文件、`$` 前缀以及系统目录。
    pub fn should_skip(&self, name: &str) -> bool {
        name.starts_with('.')
            || name.starts_with('$')
            || SYSTEM_FOLDERS.iter().any(|folder| name.starts_with(folder))
    }

    /// Drops every denied prefix that covers `path`.
    #[cfg(test)]
    pub(crate) fn allowing(mut self, path: &Path) -> Self {
        if let Ok(clean) = absolute_clean(path) {
            let candidate = normalize_for_compare(&clean.to_string_lossy());
            self.denied.retain(|prefix| !is_within(&candidate, prefix));
        }
        self
    }

    fn allows(&self, clean: &Path) -> bool {
        let candidate = normalize_for_compare(&clean.to_string_lossy());
        !self
            .denied
            .iter()
            .any(|prefix| is_within(&candidate, prefix))
    }
}

/// Makes `path` absolute and resolves `.` and `..` without touching the disk.
pub(crate) fn absolute_clean(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => clean.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            Component::Normal(segment) => clean.push(segment),
        }
    }
    Ok(clean)
}

fn normalize_for_compare(path: &str) -> String {
    let mut value = path.trim().replace('\\', "/").to_lowercase();
    while value.len() > 1 && value.ends_with('/') {
        value.pop();
    }
    value
}

fn is_within(candidate: &str, prefix: &str) -> bool {
    match candidate.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
