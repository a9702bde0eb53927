//! Error types for the cleanup orchestrator.
//!
//! Step errors never stop a run. They are wrapped in a [`StepFailure`]
//! carrying the step name and surfaced together as one [`CleanupError`]
//! once every step has been attempted.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Aggregate error returned when one or more steps failed.
///
/// Failures are kept in step order.
#[derive(Error, Debug)]
#[error("errors received during clean-up: [{}]", join_failures(.failures))]
pub struct CleanupError {
    failures: Vec<StepFailure>,
}

impl CleanupError {
    /// Build the aggregate from collected failures.
    ///
    /// Returns `None` when nothing failed, so an empty aggregate can't exist.
    pub fn from_failures(failures: Vec<StepFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// The individual step failures, in step order.
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// Names of the steps that failed, in step order.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.step_name.as_str()).collect()
    }

    /// Number of failed steps.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether there are no failures.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consume the aggregate, returning the failures.
    pub fn into_failures(self) -> Vec<StepFailure> {
        self.failures
    }
}

fn join_failures(failures: &[StepFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One step's failed `run`, tagged with the step name.
#[derive(Debug)]
pub struct StepFailure {
    /// Name of the step that failed.
    pub step_name: String,
    /// What went wrong.
    pub error: StepError,
}

impl StepFailure {
    pub fn new(step_name: impl Into<String>, error: StepError) -> Self {
        Self {
            step_name: step_name.into(),
            error,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step_name, self.error)
    }
}

impl std::error::Error for StepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Error from a single cleanup step.
#[derive(Error, Debug)]
pub enum StepError {
    /// An external command ran but exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// An external command could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Waited too long for something to appear.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The container runtime client failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Several independent sub-operations failed within one step.
    #[error("{}", .0.join("; "))]
    Multiple(Vec<String>),

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create a spawn error.
    pub fn spawn(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            tool: tool.into(),
            source,
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout(what.into())
    }

    /// Collapse sub-operation errors into one step error.
    ///
    /// A single error is returned as-is; more become [`StepError::Multiple`].
    pub fn collect(mut errors: Vec<StepError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(
                errors.iter().map(ToString::to_string).collect(),
            )),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for a whole cleanup run.
pub type CleanupResult<T> = Result<T, CleanupError>;
