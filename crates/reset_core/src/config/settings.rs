//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables,
//! one per concern. Every field has a default matching a stock k0s node,
//! so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Node paths.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Bundled containerd.
    #[serde(default)]
    pub containerd: ContainerdSettings,

    /// System users created for control plane components.
    #[serde(default)]
    pub users: UserSettings,

    /// Service manager units.
    #[serde(default)]
    pub services: ServiceSettings,

    /// CNI leftovers.
    #[serde(default)]
    pub cni: CniSettings,
}

/// Node paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// k0s data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Mount table consulted before removing the data directory.
    #[serde(default = "default_mounts_file")]
    pub mounts_file: String,
}

fn default_data_dir() -> String {
    "/var/lib/k0s".to_string()
}

fn default_mounts_file() -> String {
    "/proc/self/mounts".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mounts_file: default_mounts_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for log files. Empty disables file logging.
    #[serde(default)]
    pub logs_folder: String,
}

/// Bundled containerd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerdSettings {
    /// containerd configuration file passed when it has to be started.
    #[serde(default = "default_containerd_config")]
    pub config_path: String,

    /// How long to wait for the socket after starting containerd.
    #[serde(default = "default_start_timeout")]
    pub start_timeout_secs: u64,
}

fn default_containerd_config() -> String {
    "/etc/k0s/containerd.toml".to_string()
}

fn default_start_timeout() -> u64 {
    10
}

impl Default for ContainerdSettings {
    fn default() -> Self {
        Self {
            config_path: default_containerd_config(),
            start_timeout_secs: default_start_timeout(),
        }
    }
}

/// System users created for control plane components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_users")]
    pub names: Vec<String>,
}

fn default_users() -> Vec<String> {
    ["etcd", "kube-apiserver", "konnectivity-server", "kube-scheduler"]
        .map(String::from)
        .to_vec()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            names: default_users(),
        }
    }
}

/// Service manager units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service names, without the `.service` suffix.
    #[serde(default = "default_services")]
    pub names: Vec<String>,

    /// Directory the unit files were installed into.
    #[serde(default = "default_unit_dir")]
    pub unit_dir: String,
}

fn default_services() -> Vec<String> {
    vec!["k0scontroller".to_string(), "k0sworker".to_string()]
}

fn default_unit_dir() -> String {
    "/etc/systemd/system".to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            names: default_services(),
            unit_dir: default_unit_dir(),
        }
    }
}

/// CNI leftovers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CniSettings {
    /// CNI configuration files written by the network providers.
    #[serde(default = "default_cni_files")]
    pub config_files: Vec<String>,

    /// Network interfaces created by the network providers.
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,

    /// Where interfaces show up in sysfs.
    #[serde(default = "default_sys_class_net")]
    pub sys_class_net: String,
}

fn default_cni_files() -> Vec<String> {
    [
        "/etc/cni/net.d/10-calico.conflist",
        "/etc/cni/net.d/calico-kubeconfig",
        "/etc/cni/net.d/10-kuberouter.conflist",
    ]
    .map(String::from)
    .to_vec()
}

fn default_interfaces() -> Vec<String> {
    ["kube-bridge", "dummy0", "vxlan.calico"]
        .map(String::from)
        .to_vec()
}

fn default_sys_class_net() -> String {
    "/sys/class/net".to_string()
}

impl Default for CniSettings {
    fn default() -> Self {
        Self {
            config_files: default_cni_files(),
            interfaces: default_interfaces(),
            sys_class_net: default_sys_class_net(),
        }
    }
}

/// Configuration sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Containerd,
    Users,
    Services,
    Cni,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Containerd,
        ConfigSection::Users,
        ConfigSection::Services,
        ConfigSection::Cni,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Containerd => "containerd",
            ConfigSection::Users => "users",
            ConfigSection::Services => "services",
            ConfigSection::Cni => "cni",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Node paths",
            ConfigSection::Logging => "# Logging configuration",
            ConfigSection::Containerd => "# Bundled containerd, started to drain pods if not running",
            ConfigSection::Users => "# System users to remove",
            ConfigSection::Services => "# Service units to uninstall",
            ConfigSection::Cni => "# CNI files and interfaces to remove",
        }
    }
}
