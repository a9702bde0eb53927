//! Cleanup orchestrator for tearing down a k0s node.
//!
//! This module provides the infrastructure for running a fixed sequence
//! of teardown steps against the host. Every step decides for itself
//! whether there is anything left to clean; failures are collected and
//! reported together once every step has had its turn.
//!
//! # Architecture
//!
//! ```text
//! StepRunner
//!     ├── Step: containerd steps
//!     ├── Step: remove k0s users step
//!     ├── Step: uninstall service step
//!     ├── Step: remove directories step
//!     └── Step: CNI leftovers cleanup step
//! ```
//!
//! # Example
//!
//! ```no_run
//! use reset_core::orchestrator::{standard_steps, CleanupConfig};
//!
//! let config = CleanupConfig::new("/var/lib/k0s");
//! let report = standard_steps(&config).run_report();
//! println!("Executed: {:?}", report.executed);
//! ```

mod errors;
mod runner;
mod step;
pub mod steps;
mod types;

pub use errors::{CleanupError, CleanupResult, StepError, StepFailure, StepResult};
pub use runner::StepRunner;
pub use step::CleanupStep;
pub use steps::{CniStep, ContainerdStep, DirectoriesStep, ServicesStep, UsersStep};
pub use types::{CleanupConfig, CleanupReport, FailureSummary, ReportSummary, RUN_DIR};

/// Create a runner with all teardown steps in the correct order.
///
/// 1. containerd - drain pods while the runtime's files still exist
/// 2. users - delete the control plane users
/// 3. services - uninstall the service units
/// 4. directories - unmount and remove the data and runtime dirs
/// 5. CNI - remove network plugin leftovers
pub fn standard_steps(config: &CleanupConfig) -> StepRunner<'_> {
    StepRunner::new()
        .with_step(ContainerdStep::new(config))
        .with_step(UsersStep::new(config))
        .with_step(ServicesStep::new(config))
        .with_step(DirectoriesStep::new(config))
        .with_step(CniStep::new(config))
}

impl CleanupConfig {
    /// Run the standard steps and return the full report.
    pub fn cleanup_report(&self) -> CleanupReport {
        standard_steps(self).run_report()
    }

    /// Run the standard steps.
    ///
    /// Fails with every step failure if any executed step failed.
    pub fn cleanup(&self) -> CleanupResult<CleanupReport> {
        self.cleanup_report().into_result()
    }
}
