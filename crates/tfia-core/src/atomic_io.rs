use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::time_utils::current_unix_timestamp_ms;

/// Stores `content` at `path` so readers see either nothing or the complete
/// file. The staging file is removed when any step fails.
pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("destination '{}' has no usable file name", path.display());
    };
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    replace_via_staging(&staging_path(parent_dir, file_name), path, content)
}

fn replace_via_staging(staging: &Path, destination: &Path, content: &[u8]) -> Result<()> {
    persist_staged(staging, destination, content).inspect_err(|_| {
        let _ = fs::remove_file(staging);
    })
}

fn staging_path(parent_dir: &Path, file_name: &str) -> PathBuf {
    parent_dir.join(format!(
        ".{file_name}.partial-{}-{}",
        std::process::id(),
        current_unix_timestamp_ms()
    ))
}

fn persist_staged(staging: &Path, destination: &Path, content: &[u8]) -> Result<()> {
    let mut file: File = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)
        .with_context(|| format!("failed to create staging file {}", staging.display()))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write staging file {}", staging.display()))?;
    drop(file);
    fs::rename(staging, destination).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            staging.display(),
            destination.display()
        )
    })
}
