//! Engine configuration, loaded from and saved to JSON.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! {
//!   "verbose": true,
//!   "limits": { "max_operations": 1000000 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DteError, Result};

/// Default file name looked up by the CLI.
pub const CONFIG_FILE: &str = "dte.config.json";

/// Settings of a [`crate::template::TemplateEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log every generated script at `info` level instead of `debug`.
    pub verbose: bool,
    /// Prefix of the names given to anonymous templates.
    pub name_prefix: String,
    /// Resource limits handed to the script backend.
    pub limits: ScriptLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            name_prefix: "TemplateScript".into(),
            limits: ScriptLimits::default(),
        }
    }
}

/// Execution limits for script backends that support them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    /// Maximum number of operations per render (0 = unlimited).
    pub max_operations: u64,
    /// Maximum function call depth.
    pub max_call_levels: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
        }
    }
}

impl EngineConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DteError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| DteError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_error = |source: std::io::Error| DteError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| write_error(e.into()))?;
        std::fs::write(path, json).map_err(write_error)
    }
}
