//! Users step - removes the system users created for control plane components.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::CleanupStep;
use crate::orchestrator::types::CleanupConfig;
use crate::system::run_checked;

/// Deletes the configured system users with `userdel`.
///
/// Ready while any configured user exists. If `id` can't be run to find
/// out, the step runs and lets `userdel` decide.
pub struct UsersStep<'a> {
    config: &'a CleanupConfig,
}

impl<'a> UsersStep<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    /// `Some(true)` if the user exists, `None` if that can't be told.
    fn user_exists(&self, name: &str) -> Option<bool> {
        match self.config.runner().run("id", &["-u", name]) {
            Ok(output) => Some(output.success()),
            Err(e) => {
                tracing::debug!("Cannot look up user {}: {}", name, e);
                None
            }
        }
    }
}

impl CleanupStep for UsersStep<'_> {
    fn name(&self) -> &str {
        "remove k0s users step"
    }

    fn description(&self) -> &str {
        "Delete the system users created for control plane components"
    }

    fn needs_to_run(&self) -> bool {
        self.config
            .settings
            .users
            .names
            .iter()
            .any(|name| self.user_exists(name).unwrap_or(true))
    }

    fn run(&self) -> StepResult<()> {
        let mut errors = Vec::new();

        for name in &self.config.settings.users.names {
            if self.user_exists(name) == Some(false) {
                continue;
            }
            tracing::debug!("Deleting user {}", name);
            if let Err(e) = run_checked(self.config.runner(), "userdel", &[name.as_str()]) {
                errors.push(e);
            }
        }

        match StepError::collect(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
