//! Configuration management for prerun
//!
//! Settings are read from `.prerun/config.toml` in a workspace root. Every
//! field has a default, so a missing file or a partial file are both fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{PrerunError, Result};

/// Location of the settings file relative to a workspace root
pub const CONFIG_RELATIVE_PATH: &str = ".prerun/config.toml";

/// User-facing prerun settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Experimental Git support. TFVC is always probed.
    #[serde(default)]
    pub git_supported: bool,

    /// Explicit git executable (otherwise `git` from the PATH)
    #[serde(default)]
    pub git_path: Option<PathBuf>,

    /// Explicit TFVC command-line client (otherwise `tf` from the PATH)
    #[serde(default)]
    pub tf_path: Option<PathBuf>,

    /// Directory names that mark a TFVC local workspace
    #[serde(default = "default_tfvc_metadata_dirs")]
    pub tfvc_metadata_dirs: Vec<String>,
}

fn default_tfvc_metadata_dirs() -> Vec<String> {
    vec!["$tf".to_string(), ".tf".to_string()]
}

impl Settings {
    /// Load settings from `.prerun/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_RELATIVE_PATH);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            PrerunError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write default settings to `.prerun/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_path = root.join(CONFIG_RELATIVE_PATH);
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| PrerunError::Config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    pub fn with_git_supported(mut self, git_supported: bool) -> Self {
        self.git_supported = git_supported;
        self
    }

    /// Git executable to invoke
    pub fn git_executable(&self) -> PathBuf {
        self.git_path.clone().unwrap_or_else(|| PathBuf::from("git"))
    }

    /// TFVC client executable to invoke
    pub fn tf_executable(&self) -> PathBuf {
        self.tf_path.clone().unwrap_or_else(|| PathBuf::from("tf"))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git_supported: false,
            git_path: None,
            tf_path: None,
            tfvc_metadata_dirs: default_tfvc_metadata_dirs(),
        }
    }
}
