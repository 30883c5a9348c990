//! Configuration loading for Remoter.
//!
//! The process-wide defaults for the three tri-state settings live in
//! `~/.remoter/config.toml` (or wherever `REMOTER_CONFIG` points):
//!
//! ```toml
//! [defaults]
//! instance_argument = true
//! finally_argument = false
//! native_composition = true
//! ```
//!
//! Missing keys inherit. The raw TOML structs stay private; callers only see
//! the resolved [`Settings`].

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use remoter_types::Settings;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "REMOTER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    instance_argument: Option<bool>,
    finally_argument: Option<bool>,
    native_composition: Option<bool>,
}

impl From<RawDefaults> for Settings {
    fn from(raw: RawDefaults) -> Self {
        Self {
            instance_argument: raw.instance_argument.into(),
            finally_argument: raw.finally_argument.into(),
            native_composition: raw.native_composition.into(),
        }
    }
}

/// Parsed contents of a Remoter config file.
#[derive(Debug, Default, Deserialize)]
pub struct RemoterConfig {
    #[serde(default)]
    defaults: Option<RawDefaults>,
}

impl RemoterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse the file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the default location.
    ///
    /// A missing file is not an error. A broken file is logged and ignored so
    /// that a bad config never prevents Deferreds from working.
    pub fn load() -> Option<Self> {
        let path = config_path()?;
        if !path.exists() {
            return None;
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded Remoter config");
                Some(config)
            }
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        }
    }

    /// The `[defaults]` table resolved into settings. Absent keys inherit.
    #[must_use]
    pub fn settings(self) -> Settings {
        self.defaults.map(Settings::from).unwrap_or_default()
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// Process-wide defaults from the config file, or all-inherit when there is
/// no usable file.
#[must_use]
pub fn load_defaults() -> Settings {
    RemoterConfig::load()
        .map(RemoterConfig::settings)
        .unwrap_or_default()
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".remoter").join("config.toml"))
}
