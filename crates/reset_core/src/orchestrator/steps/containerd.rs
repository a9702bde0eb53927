//! Containerd step - drains the container runtime before its files go away.
//!
//! Pods are stopped and removed through `crictl` so their mounts and
//! network namespaces are released. If containerd isn't running, the
//! bundled binary is started just long enough to do that.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::CleanupStep;
use crate::orchestrator::types::CleanupConfig;
use crate::system::ProcessHandle;

const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stops and removes every pod known to the bundled containerd.
///
/// Ready while the bundled containerd binary is still installed. If its
/// presence can't be checked the step runs anyway.
pub struct ContainerdStep<'a> {
    config: &'a CleanupConfig,
}

impl<'a> ContainerdStep<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    fn start_containerd(&self) -> StepResult<Box<dyn ProcessHandle>> {
        let config = self.config;
        let bin = config.containerd_bin_path.display().to_string();
        let root = config.containerd_root().display().to_string();
        let state = config.containerd_state().display().to_string();
        let address = config.containerd_socket_path.display().to_string();

        tracing::debug!("containerd is not running, starting {}", bin);
        let mut process = config
            .runner()
            .spawn(
                &bin,
                &[
                    "--root",
                    root.as_str(),
                    "--state",
                    state.as_str(),
                    "--address",
                    address.as_str(),
                    "--config",
                    config.settings.containerd.config_path.as_str(),
                ],
            )
            .map_err(|e| StepError::spawn("containerd", e))?;

        let timeout = Duration::from_secs(config.settings.containerd.start_timeout_secs);
        if !wait_for(&config.containerd_socket_path, timeout) {
            stop(process.as_mut());
            return Err(StepError::timeout(format!(
                "containerd socket {}",
                config.containerd_socket_path.display()
            )));
        }

        Ok(process)
    }

    fn remove_pods(&self) -> StepResult<()> {
        let cri = &self.config.cri_ctl;
        let pods = cri.list_pods()?;
        tracing::debug!("Found {} pod(s) to remove", pods.len());

        let mut errors = Vec::new();
        for pod in &pods {
            if let Err(e) = cri.stop_pod(pod) {
                errors.push(StepError::other(format!("failed to stop pod {}: {}", pod, e)));
                continue;
            }
            if let Err(e) = cri.remove_pod(pod) {
                errors.push(StepError::other(format!("failed to remove pod {}: {}", pod, e)));
            }
        }

        match StepError::collect(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl CleanupStep for ContainerdStep<'_> {
    fn name(&self) -> &str {
        "containerd steps"
    }

    fn description(&self) -> &str {
        "Stop and remove all pods through the bundled containerd"
    }

    fn needs_to_run(&self) -> bool {
        match self.config.containerd_bin_path.try_exists() {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(
                    "Cannot check {}: {}, assuming containerd is installed",
                    self.config.containerd_bin_path.display(),
                    e
                );
                true
            }
        }
    }

    fn run(&self) -> StepResult<()> {
        let started = if self.config.containerd_socket_path.exists() {
            None
        } else {
            Some(self.start_containerd()?)
        };

        let result = self.remove_pods();

        // Only stop what this step started.
        if let Some(mut process) = started {
            stop(process.as_mut());
        }

        result
    }
}

/// Poll for `path` until `timeout` runs out. A timeout too large to
/// represent as a deadline waits indefinitely.
fn wait_for(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if path.exists() {
            return true;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
        }
        thread::sleep(SOCKET_POLL_INTERVAL);
    }
}

fn stop(process: &mut dyn ProcessHandle) {
    if let Err(e) = process.terminate() {
        tracing::debug!("Failed to stop containerd (pid {:?}): {}", process.id(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::CommandOutput;
    use crate::testing::Sandbox;

    fn with_socket_on_spawn(sandbox: &Sandbox) {
        let socket = sandbox.run_dir().join("containerd.sock");
        let removed = socket.clone();
        sandbox.host.on_spawn(move |_| {
            std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
            std::fs::write(&socket, b"").unwrap();
            CommandOutput::ok("")
        });
        sandbox.host.on_terminate(move || {
            let _ = std::fs::remove_file(&removed);
        });
    }

    #[test]
    fn ready_only_while_binary_is_installed() {
        let sandbox = Sandbox::new();
        let config = sandbox.config();
        let step = ContainerdStep::new(&config);

        assert!(!step.needs_to_run());
        sandbox.touch("var/lib/k0s/bin/containerd");
        assert!(step.needs_to_run());
    }

    #[test]
    fn running_containerd_is_drained_in_place() {
        let sandbox = Sandbox::new();
        sandbox.touch("run/k0s/containerd.sock");
        sandbox.host.respond("crictl", CommandOutput::ok(""));
        sandbox
            .host
            .respond(&crictl_prefix(&sandbox, "pods"), CommandOutput::ok("p1\np2\n"));
        let config = sandbox.config();

        ContainerdStep::new(&config).run().unwrap();

        assert!(sandbox.host.commands_starting_with("spawn").is_empty());
        let crictl = sandbox.host.commands_starting_with("crictl");
        assert_eq!(crictl.len(), 5);
        assert!(crictl[0].ends_with("pods -q"));
        assert!(crictl[1].ends_with("stopp p1"));
        assert!(crictl[2].ends_with("rmp p1"));
        assert!(crictl[3].ends_with("stopp p2"));
        assert!(crictl[4].ends_with("rmp p2"));
    }

    #[test]
    fn stopped_containerd_is_started_and_stopped_again() {
        let sandbox = Sandbox::new();
        with_socket_on_spawn(&sandbox);
        let config = sandbox.config();

        ContainerdStep::new(&config).run().unwrap();

        let commands = sandbox.host.commands();
        let spawn = commands
            .iter()
            .find(|c| c.starts_with("spawn"))
            .expect("containerd spawned");
        assert!(spawn.contains("bin/containerd --root "));
        assert!(spawn.contains("--address "));
        assert!(spawn.contains("--config /etc/k0s/containerd.toml"));
        let terminate = format!("terminate {}", config.containerd_bin_path.display());
        assert_eq!(commands.last(), Some(&terminate));
        assert!(!config.containerd_socket_path.exists());
    }

    #[test]
    fn socket_timeout_fails_and_stops_containerd() {
        let mut sandbox = Sandbox::new();
        sandbox.settings.containerd.start_timeout_secs = 0;
        let config = sandbox.config();

        let err = ContainerdStep::new(&config).run().unwrap_err();

        assert!(matches!(err, StepError::Timeout(_)));
        assert!(sandbox.host.commands().last().unwrap().starts_with("terminate"));
        assert!(sandbox.host.commands_starting_with("crictl").is_empty());
    }

    #[test]
    fn huge_start_timeout_is_accepted() {
        let mut sandbox = Sandbox::new();
        sandbox.settings.containerd.start_timeout_secs = i64::MAX as u64;
        with_socket_on_spawn(&sandbox);
        let config = sandbox.config();

        ContainerdStep::new(&config).run().unwrap();

        assert!(sandbox.host.commands().last().unwrap().starts_with("terminate"));
    }

    #[test]
    fn unrepresentable_deadline_does_not_expire() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("containerd.sock");
        std::fs::write(&socket, b"").unwrap();

        assert!(wait_for(&socket, Duration::MAX));
    }

    #[test]
    fn pod_failures_are_collected_and_other_pods_still_removed() {
        let sandbox = Sandbox::new();
        sandbox.touch("run/k0s/containerd.sock");
        sandbox
            .host
            .respond(&crictl_prefix(&sandbox, "pods"), CommandOutput::ok("p1\np2\n"));
        sandbox.host.respond(
            &crictl_prefix(&sandbox, "stopp p1"),
            CommandOutput::failed(1, "sandbox busy"),
        );
        let config = sandbox.config();

        let err = ContainerdStep::new(&config).run().unwrap_err();

        assert!(err.to_string().contains("failed to stop pod p1"));
        assert!(sandbox
            .host
            .commands()
            .iter()
            .any(|c| c.ends_with("rmp p2")));
    }

    #[test]
    fn unreachable_runtime_fails_the_step() {
        let sandbox = Sandbox::new();
        sandbox.touch("run/k0s/containerd.sock");
        sandbox.host.unavailable("crictl");
        let config = sandbox.config();

        let err = ContainerdStep::new(&config).run().unwrap_err();

        assert!(matches!(err, StepError::Runtime(_)));
    }

    fn crictl_prefix(sandbox: &Sandbox, op: &str) -> String {
        format!(
            "crictl --runtime-endpoint unix:///{}/containerd.sock {}",
            sandbox.run_dir().display(),
            op
        )
    }
}
