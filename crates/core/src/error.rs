use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::discovery::supported_formats;

/// Which half of the two-phase rename an execution error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamePhase {
    Stage,
    Commit,
    Rollback,
}

impl fmt::Display for RenamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RenamePhase::Stage => "staging to a temporary name",
            RenamePhase::Commit => "committing to the final name",
            RenamePhase::Rollback => "rolling back",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Folder '{}' does not exist", .0.display())]
    PathNotFound(PathBuf),
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Permission denied for '{}'", .path.display())]
    PermissionDenied {
        path: PathBuf,
        phase: Option<RenamePhase>,
        source: io::Error,
    },
    #[error("Folder '{}' is empty", .0.display())]
    EmptyDirectory(PathBuf),
    #[error(
        "No image files found in '{}' (supported formats: {})",
        .0.display(),
        supported_formats()
    )]
    NoRecognizedImages(PathBuf),
    #[error("Error renaming '{}' while {phase}", file_label(.file))]
    RenameFailed {
        file: PathBuf,
        phase: RenamePhase,
        source: io::Error,
    },
    #[error("Cannot read '{}'", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("Invalid rename plan: {0}")]
    InvalidPlan(String),
    #[error("rollback failed after an earlier rename error ({rollback})")]
    RollbackFailed {
        #[source]
        error: Box<RenameError>,
        rollback: Box<RenameError>,
    },
}

impl RenameError {
    /// Classifies an I/O error raised while reading `path` during validation or discovery.
    pub(crate) fn from_read(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => RenameError::PermissionDenied {
                path: path.to_path_buf(),
                phase: None,
                source,
            },
            _ => RenameError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Classifies a failed `fs::rename` of `file`.
    pub(crate) fn from_rename(file: &Path, phase: RenamePhase, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => RenameError::PermissionDenied {
                path: file.to_path_buf(),
                phase: Some(phase),
                source,
            },
            _ => RenameError::RenameFailed {
                file: file.to_path_buf(),
                phase,
                source,
            },
        }
    }

    /// True for errors detected before any file was touched.
    pub fn is_validation(&self) -> bool {
        match self {
            RenameError::PathNotFound(_)
            | RenameError::NotADirectory(_)
            | RenameError::EmptyDirectory(_)
            | RenameError::NoRecognizedImages(_)
            | RenameError::Unreadable { .. }
            | RenameError::InvalidPlan(_) => true,
            RenameError::PermissionDenied { phase, .. } => phase.is_none(),
            RenameError::RenameFailed { .. } | RenameError::RollbackFailed { .. } => false,
        }
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
