use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem signal a creation timestamp was taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampSource {
    Birth,
    ChangeTime,
    Modified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFile {
    pub path: PathBuf,
    /// Lowercased, without the leading dot.
    pub extension: String,
    pub created: DateTime<Local>,
    pub timestamp_source: TimestampSource,
}

impl ImageFile {
    pub fn new(path: PathBuf, created: DateTime<Local>, timestamp_source: TimestampSource) -> Self {
        let extension = normalized_extension(&path).unwrap_or_default();
        Self {
            path,
            extension,
            created,
            timestamp_source,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Best available creation time: birth time, then the Windows creation
/// slot, then modification time. Modification time is only a proxy.
pub fn creation_timestamp(meta: &Metadata) -> io::Result<(DateTime<Local>, TimestampSource)> {
    if let Ok(time) = meta.created() {
        return Ok((DateTime::from(time), TimestampSource::Birth));
    }
    if let Some(time) = platform_creation_time(meta) {
        return Ok((DateTime::from(time), TimestampSource::ChangeTime));
    }
    let time = meta.modified()?;
    Ok((DateTime::from(time), TimestampSource::Modified))
}

#[cfg(windows)]
fn platform_creation_time(meta: &Metadata) -> Option<SystemTime> {
    use std::os::windows::fs::MetadataExt;
    use std::time::Duration;

    // FILETIME counts 100ns ticks since 1601-01-01.
    const EPOCH_DIFF_SECS: u64 = 11_644_473_600;
    let ticks = meta.creation_time();
    let secs = (ticks / 10_000_000).checked_sub(EPOCH_DIFF_SECS)?;
    let nanos = (ticks % 10_000_000) * 100;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos as u32))
}

#[cfg(not(windows))]
fn platform_creation_time(_meta: &Metadata) -> Option<SystemTime> {
    None
}
