use crate::discovery::{collect_images, inspect_folder};
use crate::error::RenameError;
use crate::metadata::{ImageFile, TimestampSource};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub created: DateTime<Local>,
    pub timestamp_source: TimestampSource,
    pub changed: bool,
}

impl RenameCandidate {
    pub fn original_name(&self) -> String {
        file_name_of(&self.original_path)
    }

    pub fn target_name(&self) -> String {
        file_name_of(&self.target_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned_entries: usize,
    pub image_files: usize,
    pub skipped_non_image: usize,
    pub skipped_dirs: usize,
    pub planned: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub folder: PathBuf,
    pub candidates: Vec<RenameCandidate>,
    pub stats: RenameStats,
}

impl RenamePlan {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Validates `folder`, discovers its images and plans their sequential names.
pub fn plan_folder(folder: &Path) -> Result<RenamePlan, RenameError> {
    inspect_folder(folder)?;

    let mut stats = RenameStats::default();
    let images = collect_images(folder, &mut stats)?;
    if images.is_empty() {
        return Err(RenameError::NoRecognizedImages(folder.to_path_buf()));
    }

    let mut plan = generate_plan(folder, &images);
    plan.stats = RenameStats {
        planned: plan.stats.planned,
        unchanged: plan.stats.unchanged,
        ..stats
    };
    info!(
        folder = %folder.display(),
        planned = plan.stats.planned,
        unchanged = plan.stats.unchanged,
        "rename plan ready"
    );
    Ok(plan)
}

/// Assigns `01`, `02`, … in the order given. `images` must already be sorted.
pub fn generate_plan(folder: &Path, images: &[ImageFile]) -> RenamePlan {
    let mut stats = RenameStats {
        image_files: images.len(),
        ..RenameStats::default()
    };
    let mut candidates = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        let parent = image.path.parent().unwrap_or(folder);
        let target = parent.join(sequential_name(index + 1, &image.extension));
        let changed = target != image.path;
        if !changed {
            stats.unchanged += 1;
        }

        stats.planned += 1;
        candidates.push(RenameCandidate {
            original_path: image.path.clone(),
            target_path: target,
            created: image.created,
            timestamp_source: image.timestamp_source,
            changed,
        });
    }

    RenamePlan {
        folder: folder.to_path_buf(),
        candidates,
        stats,
    }
}

/// `1`-based index, at least two digits, then `.ext` when there is one.
pub fn sequential_name(index: usize, extension: &str) -> String {
    if extension.is_empty() {
        format!("{:02}", index)
    } else {
        format!("{:02}.{}", index, extension.to_ascii_lowercase())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}
