//! CNI step - removes network plugin leftovers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::CleanupStep;
use crate::orchestrator::types::CleanupConfig;
use crate::system::run_checked;

/// Removes CNI config files and the virtual interfaces the network
/// plugins created.
///
/// Ready while any of them is still present. Entries that can't be
/// checked count as absent.
pub struct CniStep<'a> {
    config: &'a CleanupConfig,
}

impl<'a> CniStep<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    fn leftover_files(&self) -> Vec<&Path> {
        self.config
            .settings
            .cni
            .config_files
            .iter()
            .map(Path::new)
            .filter(|path| exists(path))
            .collect()
    }

    fn leftover_interfaces(&self) -> Vec<&str> {
        let sys_class_net = PathBuf::from(&self.config.settings.cni.sys_class_net);
        self.config
            .settings
            .cni
            .interfaces
            .iter()
            .map(String::as_str)
            .filter(|iface| exists(&sys_class_net.join(iface)))
            .collect()
    }
}

impl CleanupStep for CniStep<'_> {
    fn name(&self) -> &str {
        "CNI leftovers cleanup step"
    }

    fn description(&self) -> &str {
        "Remove CNI config files and virtual network interfaces"
    }

    fn needs_to_run(&self) -> bool {
        !self.leftover_files().is_empty() || !self.leftover_interfaces().is_empty()
    }

    fn run(&self) -> StepResult<()> {
        let mut errors = Vec::new();

        for file in self.leftover_files() {
            tracing::debug!("Removing {}", file.display());
            if let Err(e) = fs::remove_file(file) {
                errors.push(StepError::io(format!("removing {}", file.display()), e));
            }
        }

        for iface in self.leftover_interfaces() {
            tracing::debug!("Deleting interface {}", iface);
            if let Err(e) = run_checked(self.config.runner(), "ip", &["link", "delete", iface]) {
                errors.push(e);
            }
        }

        match StepError::collect(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            tracing::debug!("Cannot check {}: {}", path.display(), e);
            false
        }
    }
}
