//! Directories step - removes the data and runtime directories.
//!
//! Anything still mounted below either directory (pod volumes, container
//! root filesystems, shm mounts) is unmounted first, deepest mount first.
//! A mount that can't be unmounted is left in place together with
//! everything below it. A directory that is itself a mount point keeps
//! its mount and only loses its contents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::CleanupStep;
use crate::orchestrator::types::CleanupConfig;
use crate::system::{mounts, run_checked};

/// Unmounts leftovers and removes the data and runtime directories.
///
/// Ready while either directory exists, unless it is a mount point with
/// nothing left in it. If existence can't be checked the step runs anyway.
pub struct DirectoriesStep<'a> {
    config: &'a CleanupConfig,
}

impl<'a> DirectoriesStep<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    fn has_leftovers(&self, dir: &Path) -> bool {
        match dir.try_exists() {
            Ok(false) => false,
            Ok(true) => !self.is_mount_point(dir) || !is_empty_dir(dir),
            Err(e) => {
                tracing::debug!("Cannot check {}: {}", dir.display(), e);
                true
            }
        }
    }

    fn is_mount_point(&self, dir: &Path) -> bool {
        match mounts::mounts_under(self.config.mounts_file(), dir) {
            Ok(targets) => targets.iter().any(|t| t == dir),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", self.config.mounts_file().display(), e);
                false
            }
        }
    }

    /// Unmount everything strictly below `dir`, then remove what can go.
    fn clear(&self, dir: &Path, errors: &mut Vec<StepError>) {
        if let Ok(false) = dir.try_exists() {
            return;
        }

        // No mount table, no removal.
        let targets = match mounts::mounts_under(self.config.mounts_file(), dir) {
            Ok(targets) => targets,
            Err(e) => {
                errors.push(StepError::io(
                    format!("reading {}", self.config.mounts_file().display()),
                    e,
                ));
                return;
            }
        };

        let self_mounted = targets.iter().any(|t| t == dir);
        let mut busy = Vec::new();
        for target in targets.iter().filter(|t| t.as_path() != dir) {
            let arg = target.display().to_string();
            tracing::debug!("Unmounting {}", arg);
            if let Err(e) = run_checked(self.config.runner(), "umount", &[arg.as_str()]) {
                errors.push(e);
                busy.push(target.clone());
            }
        }

        if self_mounted {
            tracing::debug!("{} is a mount point, removing its contents", dir.display());
        } else {
            tracing::debug!("Removing {}", dir.display());
        }
        if let Err(e) = remove_tree(dir, &busy, !self_mounted) {
            errors.push(StepError::io(format!("removing {}", dir.display()), e));
        }

        for target in busy {
            errors.push(StepError::other(format!(
                "{} is still mounted, left in place",
                target.display()
            )));
        }
    }
}

impl CleanupStep for DirectoriesStep<'_> {
    fn name(&self) -> &str {
        "remove directories step"
    }

    fn description(&self) -> &str {
        "Unmount leftovers and remove the data and runtime directories"
    }

    fn needs_to_run(&self) -> bool {
        [&self.config.data_dir, &self.config.run_dir]
            .iter()
            .any(|dir| self.has_leftovers(dir))
    }

    fn run(&self) -> StepResult<()> {
        let mut errors = Vec::new();

        for dir in [&self.config.data_dir, &self.config.run_dir] {
            self.clear(dir, &mut errors);
        }

        match StepError::collect(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Remove `path` recursively, leaving every path in `keep` and everything
/// below it untouched. With `remove_root` false only the contents go.
fn remove_tree(path: &Path, keep: &[PathBuf], remove_root: bool) -> io::Result<()> {
    if keep.iter().any(|k| k == path) {
        return Ok(());
    }

    if remove_root && !keep.iter().any(|k| k.starts_with(path)) {
        return match fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
    }

    let entries = match fs::read_dir(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        other => other?,
    };
    for entry in entries {
        let entry = entry?;
        let child = entry.path();
        if entry.file_type()?.is_dir() {
            remove_tree(&child, keep, true)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}
