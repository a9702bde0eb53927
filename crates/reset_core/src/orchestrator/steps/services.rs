//! Services step - uninstalls the k0s service manager units.

use std::fs;
use std::path::PathBuf;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::CleanupStep;
use crate::orchestrator::types::CleanupConfig;
use crate::system::run_checked;

/// Stops, disables and removes the k0s systemd units.
///
/// Ready while any unit file is installed. If a unit file can't be
/// checked the step treats it as absent, since there is nothing it could
/// safely remove.
pub struct ServicesStep<'a> {
    config: &'a CleanupConfig,
}

impl<'a> ServicesStep<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    fn unit_path(&self, service: &str) -> PathBuf {
        PathBuf::from(&self.config.settings.services.unit_dir).join(format!("{service}.service"))
    }

    fn installed(&self) -> Vec<(&str, PathBuf)> {
        self.config
            .settings
            .services
            .names
            .iter()
            .map(|name| (name.as_str(), self.unit_path(name)))
            .filter(|(_, path)| match path.try_exists() {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::debug!("Cannot check {}: {}", path.display(), e);
                    false
                }
            })
            .collect()
    }
}

impl CleanupStep for ServicesStep<'_> {
    fn name(&self) -> &str {
        "uninstall service step"
    }

    fn description(&self) -> &str {
        "Stop, disable and remove the k0s service units"
    }

    fn needs_to_run(&self) -> bool {
        !self.installed().is_empty()
    }

    fn run(&self) -> StepResult<()> {
        let runner = self.config.runner();
        let mut errors = Vec::new();

        for (service, unit_path) in self.installed() {
            let unit = format!("{service}.service");

            // A unit that is already stopped or disabled is fine.
            for action in ["stop", "disable"] {
                if let Err(e) = run_checked(runner, "systemctl", &[action, unit.as_str()]) {
                    tracing::debug!("systemctl {} {}: {}", action, unit, e);
                }
            }

            if let Err(e) = fs::remove_file(&unit_path) {
                errors.push(StepError::io(
                    format!("removing {}", unit_path.display()),
                    e,
                ));
            }
        }

        if let Err(e) = run_checked(runner, "systemctl", &["daemon-reload"]) {
            errors.push(e);
        }

        match StepError::collect(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
