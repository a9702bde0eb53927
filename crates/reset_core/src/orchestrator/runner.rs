//! Step runner that executes cleanup steps in sequence.

use super::errors::{CleanupResult, StepFailure};
use super::step::CleanupStep;
use super::types::CleanupReport;

/// Runner that drives a fixed sequence of steps.
///
/// Each step is asked whether it needs to run and, if so, run once.
/// A failing step is logged and recorded, and the runner carries on with
/// the next one. Failures only surface after the whole sequence.
pub struct StepRunner<'a> {
    /// Steps to execute in order.
    steps: Vec<Box<dyn CleanupStep + 'a>>,
}

impl<'a> StepRunner<'a> {
    /// Create a new empty runner.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the runner.
    pub fn add_step<S: CleanupStep + 'a>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: CleanupStep + 'a>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run every step and return the report, failures included.
    ///
    /// Never stops early.
    pub fn run_report(&self) -> CleanupReport {
        let mut report = CleanupReport::start();

        for step in &self.steps {
            let step_name = step.name();

            if !step.needs_to_run() {
                tracing::debug!("Skipping '{}': nothing to clean", step_name);
                report.skipped.push(step_name.to_string());
                continue;
            }

            tracing::info!("* {}", step_name);
            report.executed.push(step_name.to_string());

            if let Err(e) = step.run() {
                tracing::debug!("{}", e);
                report.failures.push(StepFailure::new(step_name, e));
            }
        }

        report.finish();
        report
    }

    /// Run every step, then fold the failures into one result.
    ///
    /// Returns `Err(CleanupError)` listing every failed step in order,
    /// or the report if all executed steps succeeded.
    pub fn run(&self) -> CleanupResult<CleanupReport> {
        self.run_report().into_result()
    }

    /// Get the number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Get `(name, description)` pairs in order.
    pub fn step_descriptions(&self) -> Vec<(&str, &str)> {
        self.steps
            .iter()
            .map(|s| (s.name(), s.description()))
            .collect()
    }
}

impl Default for StepRunner<'_> {
    fn default() -> Self {
        Self::new()
    }
}
