//! Planning of multi-year logistics networks.
//!
//! A request names candidate facilities, destinations and a demand forecast. For each network size
//! in a range, a mixed-integer program chooses which facilities to open and how to route demand in
//! every year of the forecast. The best network size is then selected from the sweep.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod baseline;
pub mod cli;
pub mod config;
pub mod cost_matrix;
pub mod error;
pub mod estimate;
pub mod facility;
pub mod forecast;
pub mod horizon;
pub mod id;
pub mod input;
pub mod location;
pub mod log;
pub mod output;
pub mod request;
pub mod response;
pub mod service;
pub mod settings;
pub mod solver;
pub mod sweep;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory holding the program's configuration files
pub fn get_netplan_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so fall back to the working directory
        return PathBuf::from(".netplan");
    };

    config_dir.push("netplan");
    config_dir
}
