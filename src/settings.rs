//! Program settings, read from `settings.toml` in the user's config directory.
use crate::get_netplan_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for netplan.
# Uncomment a line to change the setting from its default value.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_netplan_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The program log level (off, error, warn, info, debug or trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite existing output files
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to write per-year allocations for every scenario to CSV
    #[serde(default)]
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Load the settings file, using defaults if it doesn't exist
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The contents of a settings file with every option commented out and documented
    pub fn default_file_contents() -> Result<String> {
        let settings_raw =
            toml::to_string(&Settings::default()).context("Could not convert settings to TOML")?;

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };

            let docs = Settings::get_field_docs(field.trim())?;
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim())?;
            }
            writeln!(&mut out, "# {}", line.trim())?;
        }

        Ok(out)
    }
}
