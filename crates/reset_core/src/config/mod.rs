//! Configuration management for node-reset.
//!
//! This module provides:
//! - TOML-based configuration with one section per cleanup concern
//! - Atomic file writes (write to temp, then rename)
//! - Cleanup on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use reset_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("/etc/k0s/node-reset.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Data dir: {}", config.settings().paths.data_dir);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CniSettings, ConfigSection, ContainerdSettings, LoggingSettings, PathSettings,
    ServiceSettings, Settings, UserSettings,
};
