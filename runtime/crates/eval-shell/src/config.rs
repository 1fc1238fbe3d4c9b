//! Shell configuration
//!
//! Usually embedded as a TOML table:
//!
//! ```toml
//! modules_path = "/var/lib/notebook/modules"
//!
//! [package_manager]
//! program = "npm"
//! log_level = "silent"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ShellError;
use crate::package::PackageManagerOptions;

/// Per-shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    /// Directory modules are installed into (the package manager prefix).
    pub modules_path: PathBuf,

    /// Directory under `modules_path` that holds one directory per package.
    /// [`Npm`](crate::package::Npm) only supports the default, `node_modules`.
    #[serde(default = "default_package_root")]
    pub package_root: String,

    #[serde(default)]
    pub package_manager: PackageManagerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageManagerConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub progress: bool,

    #[serde(default)]
    pub color: bool,
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            log_level: default_log_level(),
            progress: false,
            color: false,
        }
    }
}

fn default_package_root() -> String {
    "node_modules".to_string()
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_log_level() -> String {
    "silent".to_string()
}

impl ShellConfig {
    pub fn new(modules_path: impl Into<PathBuf>) -> Self {
        Self {
            modules_path: modules_path.into(),
            package_root: default_package_root(),
            package_manager: PackageManagerConfig::default(),
        }
    }

    /// Load config from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ShellError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Option<String> {
        toml::to_string_pretty(self).ok()
    }

    /// `<modules_path>/<package_root>`, where installed packages live.
    pub fn packages_dir(&self) -> PathBuf {
        self.modules_path.join(&self.package_root)
    }

    pub fn modules_path(&self) -> &Path {
        &self.modules_path
    }

    /// Options handed to the package manager at bootstrap.
    pub fn package_manager_options(&self) -> PackageManagerOptions {
        PackageManagerOptions {
            prefix: self.modules_path.clone(),
            package_root: self.package_root.clone(),
            log_level: self.package_manager.log_level.clone(),
            progress: self.package_manager.progress,
            color: self.package_manager.color,
        }
    }
}
