//! Cleanup step trait definition.
//!
//! All teardown steps implement this trait, providing a consistent
//! interface for the readiness check and the cleanup action.

use super::errors::StepResult;

/// Trait for cleanup steps.
///
/// The runner calls these methods in order:
///
/// 1. `needs_to_run` - Check whether the host still has anything to clean
/// 2. `run` - Perform the cleanup (only if step 1 returned true)
///
/// # Example
///
/// ```ignore
/// struct SocketStep<'a> {
///     config: &'a CleanupConfig,
/// }
///
/// impl CleanupStep for SocketStep<'_> {
///     fn name(&self) -> &str { "remove socket" }
///
///     fn needs_to_run(&self) -> bool {
///         self.config.containerd_socket_path.exists()
///     }
///
///     fn run(&self) -> StepResult<()> {
///         std::fs::remove_file(&self.config.containerd_socket_path)
///             .map_err(|e| StepError::io("removing socket", e))
///     }
/// }
/// ```
pub trait CleanupStep: Send + Sync {
    /// Get the step name (for logging and error context).
    ///
    /// Has no effect on ordering or on whether the step runs.
    fn name(&self) -> &str;

    /// Whether the host still holds state this step removes.
    ///
    /// Must not modify the host and must not fail. If the state cannot be
    /// determined, the step decides for itself which way to lean.
    fn needs_to_run(&self) -> bool;

    /// Perform the cleanup.
    ///
    /// Called at most once per run. A failure is recorded and the run
    /// moves on to the next step.
    fn run(&self) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
