use crate::error::{RenameError, RenamePhase};
use crate::planner::RenamePlan;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Prefix of the names files sit under between the two rename phases.
pub const TEMP_PREFIX: &str = ".snapseq_tmp_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyResult {
    pub renamed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    /// Undo staged and committed renames when a later rename fails.
    pub rollback_on_failure: bool,
}

#[derive(Debug, Clone)]
struct StagedRename {
    original_path: PathBuf,
    target_path: PathBuf,
    temp_path: PathBuf,
}

#[derive(Debug)]
struct PhaseFailure {
    phase: RenamePhase,
    completed: usize,
    error: RenameError,
}

/// Same file on disk, whatever spelling of the name reached it.
#[cfg(unix)]
type FileIdentity = (u64, u64);
#[cfg(not(unix))]
type FileIdentity = PathBuf;

pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult, RenameError> {
    apply_plan_with_options(plan, &ApplyOptions::default())
}

pub fn apply_plan_with_options(
    plan: &RenamePlan,
    options: &ApplyOptions,
) -> Result<ApplyResult, RenameError> {
    if plan.candidates.is_empty() {
        return Ok(ApplyResult {
            renamed: 0,
            unchanged: 0,
        });
    }

    validate_apply_candidates(plan)?;
    let entries = staged_renames(plan);

    info!(files = entries.len(), "staging files to temporary names");
    if let Err(failure) = stage_all(&entries) {
        return Err(abort(&entries, failure, options));
    }

    info!(files = entries.len(), "committing final names");
    let renamed = commit_all(&entries).map_err(|failure| abort(&entries, failure, options))?;

    Ok(ApplyResult {
        renamed,
        unchanged: plan.candidates.iter().filter(|c| !c.changed).count(),
    })
}

fn staged_renames(plan: &RenamePlan) -> Vec<StagedRename> {
    let mut reserved: HashSet<PathBuf> = plan
        .candidates
        .iter()
        .flat_map(|c| [c.original_path.clone(), c.target_path.clone()])
        .collect();

    plan.candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| StagedRename {
            original_path: candidate.original_path.clone(),
            target_path: candidate.target_path.clone(),
            temp_path: reserve_temp_path(&candidate.original_path, index, &mut reserved),
        })
        .collect()
}

fn stage_all(entries: &[StagedRename]) -> Result<(), PhaseFailure> {
    for (completed, entry) in entries.iter().enumerate() {
        let result = if entry.temp_path.symlink_metadata().is_ok() {
            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("temporary name {} already exists", entry.temp_path.display()),
            ))
        } else {
            fs::rename(&entry.original_path, &entry.temp_path)
        };

        if let Err(err) = result {
            error!(file = %entry.original_path.display(), cause = %err, "stage rename failed");
            let error = RenameError::from_rename(&entry.original_path, RenamePhase::Stage, err);
            return Err(PhaseFailure {
                phase: RenamePhase::Stage,
                completed,
                error,
            });
        }
    }
    Ok(())
}

fn commit_all(entries: &[StagedRename]) -> Result<usize, PhaseFailure> {
    for (completed, entry) in entries.iter().enumerate() {
        if let Err(err) = fs::rename(&entry.temp_path, &entry.target_path) {
            error!(file = %entry.target_path.display(), cause = %err, "final rename failed");
            let error = RenameError::from_rename(&entry.target_path, RenamePhase::Commit, err);
            return Err(PhaseFailure {
                phase: RenamePhase::Commit,
                completed,
                error,
            });
        }
    }
    Ok(entries.len())
}

/// Turns a phase failure into the returned error, rolling back first when asked to.
fn abort(entries: &[StagedRename], failure: PhaseFailure, options: &ApplyOptions) -> RenameError {
    if !options.rollback_on_failure {
        return failure.error;
    }

    let rollback = match failure.phase {
        RenamePhase::Commit => {
            warn!(committed = failure.completed, "rolling back committed files");
            rollback_after_final_rename_failure(entries, failure.completed)
        }
        RenamePhase::Stage | RenamePhase::Rollback => {
            warn!(staged = failure.completed, "rolling back staged files");
            rollback_staged_to_original_paths(&entries[..failure.completed])
        }
    };
    match rollback {
        Ok(()) => failure.error,
        Err(rollback) => RenameError::RollbackFailed {
            error: Box::new(failure.error),
            rollback: Box::new(rollback),
        },
    }
}

fn validate_apply_candidates(plan: &RenamePlan) -> Result<(), RenameError> {
    let mut seen_original_paths = HashSet::<&Path>::new();
    let mut seen_target_paths = HashSet::<&Path>::new();

    for candidate in &plan.candidates {
        if !seen_original_paths.insert(&candidate.original_path) {
            return Err(RenameError::InvalidPlan(format!(
                "duplicate source file {}",
                candidate.original_path.display()
            )));
        }
        if !seen_target_paths.insert(&candidate.target_path) {
            return Err(RenameError::InvalidPlan(format!(
                "duplicate target {}",
                candidate.target_path.display()
            )));
        }
        if candidate.target_path.parent() != candidate.original_path.parent() {
            return Err(RenameError::InvalidPlan(format!(
                "target {} is not next to {}",
                candidate.target_path.display(),
                candidate.original_path.display()
            )));
        }
    }

    // Case-insensitive volumes resolve `01.jpg` to an existing `01.JPG`.
    let source_ids: HashSet<FileIdentity> = plan
        .candidates
        .iter()
        .filter_map(|c| file_identity(&c.original_path))
        .collect();
    for candidate in &plan.candidates {
        let Some(id) = file_identity(&candidate.target_path) else {
            continue;
        };
        if !source_ids.contains(&id) {
            return Err(RenameError::InvalidPlan(format!(
                "target {} is occupied by a file outside the plan",
                candidate.target_path.display()
            )));
        }
    }

    Ok(())
}

#[cfg(unix)]
fn file_identity(path: &Path) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    let meta = path.symlink_metadata().ok()?;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(path: &Path) -> Option<FileIdentity> {
    // Canonical paths carry the on-disk spelling of the name.
    fs::canonicalize(path).ok()
}

fn rollback_staged_to_original_paths(staged: &[StagedRename]) -> Result<(), RenameError> {
    for entry in staged.iter().rev() {
        if !entry.temp_path.exists() {
            continue;
        }
        fs::rename(&entry.temp_path, &entry.original_path).map_err(|err| {
            RenameError::from_rename(&entry.temp_path, RenamePhase::Rollback, err)
        })?;
    }
    Ok(())
}

fn rollback_after_final_rename_failure(
    staged: &[StagedRename],
    finalized: usize,
) -> Result<(), RenameError> {
    for entry in staged[..finalized].iter().rev() {
        if !entry.target_path.exists() {
            continue;
        }
        fs::rename(&entry.target_path, &entry.temp_path).map_err(|err| {
            RenameError::from_rename(&entry.target_path, RenamePhase::Rollback, err)
        })?;
    }
    rollback_staged_to_original_paths(staged)
}

/// First temp name for `original_path` that is neither on disk nor already claimed.
fn reserve_temp_path(
    original_path: &Path,
    index: usize,
    reserved: &mut HashSet<PathBuf>,
) -> PathBuf {
    let mut attempt = 0usize;
    let mut candidate = temp_path_for(original_path, index, attempt);
    while reserved.contains(&candidate) || candidate.symlink_metadata().is_ok() {
        attempt += 1;
        candidate = temp_path_for(original_path, index, attempt);
    }
    reserved.insert(candidate.clone());
    candidate
}

fn temp_path_for(original_path: &Path, index: usize, attempt: usize) -> PathBuf {
    let parent = original_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = original_path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    if attempt == 0 {
        parent.join(format!("{}{}_{}", TEMP_PREFIX, index, file_name))
    } else {
        parent.join(format!("{}{}_{:03}_{}", TEMP_PREFIX, index, attempt, file_name))
    }
}
