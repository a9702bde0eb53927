//! Core types for the cleanup orchestrator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{CleanupError, CleanupResult, StepFailure};
use crate::config::Settings;
use crate::runtime::CriCtl;
use crate::system::{CommandRunner, HostCommandRunner};

/// Runtime working directory of k0s.
///
/// Holds the live containerd socket and state while the node is active.
pub const RUN_DIR: &str = "/run/k0s";

/// Shared, read-only configuration lent to every cleanup step.
///
/// Every path is derived once, in the constructor, from the data
/// directory and the runtime directory. Steps borrow it for their whole
/// lifetime, so nothing can change it once steps have been built.
pub struct CleanupConfig {
    /// k0s data directory (e.g. `/var/lib/k0s`).
    pub data_dir: PathBuf,
    /// Runtime working directory ([`RUN_DIR`]).
    pub run_dir: PathBuf,
    /// Bundled containerd binary, `<data_dir>/bin/containerd`.
    pub containerd_bin_path: PathBuf,
    /// containerd socket, `<run_dir>/containerd.sock`.
    pub containerd_socket_path: PathBuf,
    /// CRI endpoint URL for the socket above.
    pub cri_socket_url: String,
    /// Container runtime client bound to `cri_socket_url`.
    pub cri_ctl: CriCtl,
    /// Host layout and per-step settings.
    pub settings: Settings,
    /// Runner every step uses for external commands.
    pub runner: Arc<dyn CommandRunner>,
}

impl CleanupConfig {
    /// Configuration for the local host with default settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_settings(data_dir, Settings::default(), Arc::new(HostCommandRunner))
    }

    /// Configuration with explicit settings and command runner.
    pub fn with_settings(
        data_dir: impl Into<PathBuf>,
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self::with_run_dir(data_dir, RUN_DIR, settings, runner)
    }

    /// Configuration rooted at a runtime directory other than [`RUN_DIR`].
    pub fn with_run_dir(
        data_dir: impl Into<PathBuf>,
        run_dir: impl Into<PathBuf>,
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let data_dir = data_dir.into();
        let run_dir = run_dir.into();

        let cri_socket_url = format!("unix:///{}/containerd.sock", run_dir.display());
        let cri_ctl = CriCtl::new(cri_socket_url.clone(), Arc::clone(&runner));

        Self {
            containerd_bin_path: data_dir.join("bin").join("containerd"),
            containerd_socket_path: run_dir.join("containerd.sock"),
            cri_socket_url,
            cri_ctl,
            data_dir,
            run_dir,
            settings,
            runner,
        }
    }

    /// Command runner shared by the steps.
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Directory containerd keeps its persistent state in.
    pub fn containerd_root(&self) -> PathBuf {
        self.data_dir.join("containerd")
    }

    /// Directory containerd keeps its ephemeral state in.
    pub fn containerd_state(&self) -> PathBuf {
        self.run_dir.join("containerd")
    }

    /// Mount table to consult before removing directories.
    pub fn mounts_file(&self) -> &Path {
        Path::new(&self.settings.paths.mounts_file)
    }
}

impl std::fmt::Debug for CleanupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupConfig")
            .field("data_dir", &self.data_dir)
            .field("run_dir", &self.run_dir)
            .field("containerd_bin_path", &self.containerd_bin_path)
            .field("containerd_socket_path", &self.containerd_socket_path)
            .field("cri_socket_url", &self.cri_socket_url)
            .finish_non_exhaustive()
    }
}

/// Record of one cleanup run.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// When the run started.
    pub started_at: String,
    /// When the run finished.
    pub finished_at: Option<String>,
    /// Steps whose readiness check returned true, in order.
    pub executed: Vec<String>,
    /// Steps that had nothing to clean, in order.
    pub skipped: Vec<String>,
    /// Executed steps that failed, in order.
    pub failures: Vec<StepFailure>,
}

impl CleanupReport {
    pub(crate) fn start() -> Self {
        Self {
            started_at: chrono::Local::now().to_rfc3339(),
            ..Default::default()
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
    }

    /// Check if every executed step succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Serializable view of the report.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            executed: self.executed.clone(),
            skipped: self.skipped.clone(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureSummary {
                    step: f.step_name.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    /// Turn the report into the run's final result.
    ///
    /// Any failure moves the whole failure set into a [`CleanupError`].
    pub fn into_result(mut self) -> CleanupResult<Self> {
        let failures = std::mem::take(&mut self.failures);
        match CleanupError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// JSON-friendly summary of a [`CleanupReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<FailureSummary>,
}

/// One failed step in a [`ReportSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub step: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::errors::StepError;

    #[test]
    fn paths_derive_from_data_dir_and_run_dir() {
        let config = CleanupConfig::new("/var/lib/k0s");

        assert_eq!(config.run_dir, PathBuf::from("/run/k0s"));
        assert_eq!(
            config.containerd_bin_path,
            PathBuf::from("/var/lib/k0s/bin/containerd")
        );
        assert_eq!(
            config.containerd_socket_path,
            PathBuf::from("/run/k0s/containerd.sock")
        );
        assert_eq!(config.cri_socket_url, "unix:////run/k0s/containerd.sock");
        assert_eq!(config.cri_ctl.endpoint(), config.cri_socket_url);
        assert_eq!(config.containerd_root(), PathBuf::from("/var/lib/k0s/containerd"));
        assert_eq!(config.containerd_state(), PathBuf::from("/run/k0s/containerd"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = CleanupConfig::new("/opt/k0s");
        let b = CleanupConfig::new("/opt/k0s");

        assert_eq!(a.containerd_bin_path, b.containerd_bin_path);
        assert_eq!(a.cri_socket_url, b.cri_socket_url);
    }

    #[test]
    fn report_with_failures_becomes_error() {
        let mut report = CleanupReport::start();
        report.executed.push("users".into());
        report
            .failures
            .push(StepFailure::new("users", StepError::other("locked")));
        report.finish();

        let summary = report.summary();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].step, "users");

        let err = report.into_result().unwrap_err();
        assert_eq!(err.failed_steps(), vec!["users"]);
    }

    #[test]
    fn summary_serializes() {
        let mut report = CleanupReport::start();
        report.skipped.push("cni".into());
        report.finish();

        let json = serde_json::to_string(&report.summary()).unwrap();
        assert!(json.contains("\"skipped\":[\"cni\"]"));
        assert!(json.contains("\"failures\":[]"));
        assert!(report.into_result().is_ok());
    }
}
