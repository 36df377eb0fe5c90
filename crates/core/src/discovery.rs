use crate::error::RenameError;
use crate::metadata::{creation_timestamp, ImageFile};
use crate::planner::RenameStats;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

pub const RECOGNIZED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "heic"];

/// Checks that `folder` exists, is a listable directory and has at least one entry.
pub fn inspect_folder(folder: &Path) -> Result<(), RenameError> {
    let meta = match fs::metadata(folder) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(RenameError::PathNotFound(folder.to_path_buf()));
        }
        Err(err) => return Err(RenameError::from_read(folder, err)),
    };
    if !meta.is_dir() {
        return Err(RenameError::NotADirectory(folder.to_path_buf()));
    }

    let mut entries = fs::read_dir(folder).map_err(|err| RenameError::from_read(folder, err))?;
    match entries.next() {
        None => Err(RenameError::EmptyDirectory(folder.to_path_buf())),
        Some(Err(err)) => Err(RenameError::from_read(folder, err)),
        Some(Ok(_)) => Ok(()),
    }
}

/// Recognized images directly inside `folder`, oldest first.
pub fn find_images(folder: &Path) -> Result<Vec<ImageFile>, RenameError> {
    let mut stats = RenameStats::default();
    collect_images(folder, &mut stats)
}

pub(crate) fn collect_images(
    folder: &Path,
    stats: &mut RenameStats,
) -> Result<Vec<ImageFile>, RenameError> {
    let mut out = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| RenameError::from_read(folder, io::Error::from(err)))?;
        let path = entry.path();
        stats.scanned_entries += 1;
        if path.is_dir() {
            stats.skipped_dirs += 1;
            continue;
        }
        if !path.is_file() || !is_recognized_image(path) {
            stats.skipped_non_image += 1;
            continue;
        }

        let meta = fs::metadata(path).map_err(|err| RenameError::from_read(path, err))?;
        let (created, source) =
            creation_timestamp(&meta).map_err(|err| RenameError::from_read(path, err))?;
        debug!(file = %path.display(), %created, ?source, "discovered image");

        stats.image_files += 1;
        out.push(ImageFile::new(path.to_path_buf(), created, source));
    }

    Ok(sort_by_creation(out))
}

/// Stable ascending sort, so equal timestamps keep enumeration order.
pub fn sort_by_creation(mut files: Vec<ImageFile>) -> Vec<ImageFile> {
    files.sort_by_key(|file| file.created);
    files
}

pub fn is_recognized_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            RECOGNIZED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

pub fn supported_formats() -> String {
    let mut formats: Vec<String> = RECOGNIZED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect();
    formats.sort();
    formats.join(", ")
}
