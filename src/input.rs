//! Common routines for handling input data.
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Parse a JSON file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the JSON file
///
/// # Returns
///
/// * The deserialised JSON data or an error if the file could not be read or parsed.
pub fn read_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let json_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let json_data = serde_json::from_str(&json_str).with_context(|| input_err_msg(file_path))?;
    Ok(json_data)
}

/// Read a value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value.into())
}

/// Read a value, checking that it is > 0 and <= 1
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(value > 0.0 && value <= 1.0) {
        Err(serde::de::Error::custom("Value must be > 0 and <= 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Check whether an iterator contains values that are sorted and unique
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}
