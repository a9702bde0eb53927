//! Reset Core - teardown logic for node-reset
//!
//! This crate contains everything needed to strip a node of the k0s runtime
//! stack, with zero terminal dependencies. It can be driven by the
//! `node-reset` binary or embedded in another tool.
//!
//! ```no_run
//! use reset_core::orchestrator::CleanupConfig;
//!
//! let config = CleanupConfig::new("/var/lib/k0s");
//! if let Err(e) = config.cleanup() {
//!     eprintln!("{}", e);
//! }
//! ```

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod runtime;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
