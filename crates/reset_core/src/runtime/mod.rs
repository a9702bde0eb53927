//! Container runtime client.
//!
//! [`CriCtl`] drives `crictl` against the node's containerd socket. Only
//! the pod operations needed to drain the runtime before removal are
//! exposed.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::system::CommandRunner;

/// Errors from the container runtime client.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to run crictl: {0}")]
    Spawn(#[from] io::Error),

    #[error("crictl {operation} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        operation: String,
        exit_code: i32,
        message: String,
    },
}

/// Result type for runtime client operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// `crictl` bound to one runtime endpoint.
#[derive(Clone)]
pub struct CriCtl {
    endpoint: String,
    runner: Arc<dyn CommandRunner>,
}

impl CriCtl {
    /// Create a client for `endpoint` (e.g. `unix:///run/k0s/containerd.sock`).
    pub fn new(endpoint: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            endpoint: endpoint.into(),
            runner,
        }
    }

    /// The runtime endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// IDs of every pod sandbox known to the runtime.
    pub fn list_pods(&self) -> RuntimeResult<Vec<String>> {
        let stdout = self.crictl("pods", &["pods", "-q"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Stop a pod sandbox and its containers.
    pub fn stop_pod(&self, id: &str) -> RuntimeResult<()> {
        self.crictl("stopp", &["stopp", id]).map(|_| ())
    }

    /// Remove a stopped pod sandbox.
    pub fn remove_pod(&self, id: &str) -> RuntimeResult<()> {
        self.crictl("rmp", &["rmp", id]).map(|_| ())
    }

    fn crictl(&self, operation: &str, args: &[&str]) -> RuntimeResult<String> {
        let mut full = vec!["--runtime-endpoint", self.endpoint.as_str()];
        full.extend_from_slice(args);

        let output = self.runner.run("crictl", &full)?;
        if !output.success() {
            return Err(RuntimeError::CommandFailed {
                operation: operation.to_string(),
                exit_code: output.code.unwrap_or(-1),
                message: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl std::fmt::Debug for CriCtl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriCtl")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
