//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Cleanup on load (unknown sections dropped, missing defaults filled in)
//! - Unknown sections detected with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the node-reset configuration file.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Consume the manager, keeping the settings.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// An existing file is rewritten if it had unknown sections or
    /// was missing defaults.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Rewriting cleaned config {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = render(&self.settings)?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Write content to config file atomically.
    ///
    /// Writes to a temp file first, then renames.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Same directory, so the rename can't cross filesystems.
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Parse config content, reporting whether it needs rewriting.
fn parse_validate_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;

    // Missing fields pick up their defaults here.
    let settings: Settings = toml::from_str(content)?;

    let has_unknown = doc.iter().any(|(key, _)| {
        !ConfigSection::ALL
            .iter()
            .any(|section| section.table_name() == key)
    });

    let rendered = render(&settings)?;
    let was_modified = has_unknown || content.trim() != rendered.trim();

    Ok((settings, was_modified))
}

fn section_toml(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let content = match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        ConfigSection::Containerd => toml::to_string_pretty(&settings.containerd)?,
        ConfigSection::Users => toml::to_string_pretty(&settings.users)?,
        ConfigSection::Services => toml::to_string_pretty(&settings.services)?,
        ConfigSection::Cni => toml::to_string_pretty(&settings.cni)?,
    };
    Ok(content)
}

/// Generate config content with a comment above every section.
fn render(settings: &Settings) -> ConfigResult<String> {
    let mut output = String::new();

    output.push_str("# node-reset configuration\n");
    output.push_str(
        "# This file is auto-generated. Unknown sections are dropped on load.\n",
    );

    for section in ConfigSection::ALL {
        output.push('\n');
        output.push_str(section.comment());
        output.push('\n');
        output.push_str(&format!("[{}]\n", section.table_name()));
        for line in section_toml(settings, section)?.lines() {
            output.push_str(line);
            output.push('\n');
        }
    }

    Ok(output)
}
