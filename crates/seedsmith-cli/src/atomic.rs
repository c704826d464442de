use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CliError, CliResult};

/// Write `value` as pretty JSON through [`write_bytes_atomic`].
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    write_bytes_atomic(path, &data)
}

/// Write to a sibling temp file, sync, then rename over `path`.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> CliResult<()> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = parent {
        sync_dir(parent)?;
    }

    Ok(())
}

fn temp_path(path: &Path) -> CliResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::InvalidConfig(format!("invalid output path {}", path.display())))?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
