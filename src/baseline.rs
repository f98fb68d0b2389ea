//! Providers of the historical baseline transportation cost.
use crate::error::{PlanningError, PlanningResult};
use crate::units::Money;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Annual transportation spend assumed when no baseline is available
pub const DEFAULT_BASELINE_COST: Money = Money(5_000_000.0);

/// Supplies the historical annual transportation spend
pub trait BaselineProvider {
    /// Look up the baseline.
    ///
    /// Fails with [`PlanningError::UpstreamUnavailable`] if the baseline can't be obtained.
    fn get(&self) -> PlanningResult<Money>;
}

/// Always supplies [`DEFAULT_BASELINE_COST`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBaselineProvider;

impl BaselineProvider for DefaultBaselineProvider {
    fn get(&self) -> PlanningResult<Money> {
        Ok(DEFAULT_BASELINE_COST)
    }
}

/// Supplies a fixed, known baseline
#[derive(Debug, Clone, Copy)]
pub struct FixedBaselineProvider(pub Money);

impl BaselineProvider for FixedBaselineProvider {
    fn get(&self) -> PlanningResult<Money> {
        Ok(self.0)
    }
}

/// Reads the baseline from a TOML file of the form `annual_cost = 1234.5`
#[derive(Debug, Clone)]
pub struct FileBaselineProvider {
    /// Path to the file
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct BaselineFile {
    annual_cost: Money,
}

impl BaselineProvider for FileBaselineProvider {
    fn get(&self) -> PlanningResult<Money> {
        let unavailable = |err: &dyn std::fmt::Display| {
            PlanningError::UpstreamUnavailable(format!(
                "Could not read baseline from {}: {err}",
                self.path.display()
            ))
        };
        let contents = fs::read_to_string(&self.path).map_err(|err| unavailable(&err))?;
        let file: BaselineFile = toml::from_str(&contents).map_err(|err| unavailable(&err))?;
        if !(file.annual_cost.is_finite() && file.annual_cost > Money(0.0)) {
            return Err(unavailable(&"annual_cost must be a positive number"));
        }

        Ok(file.annual_cost)
    }
}

/// The baseline used for a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBaseline {
    /// Annual transportation spend
    pub annual_cost: Money,
    /// Whether the default was used because the provider failed
    pub fallback_used: bool,
}

/// Get the baseline from the provider, falling back to the default on failure
pub fn resolve_baseline(provider: &dyn BaselineProvider) -> ResolvedBaseline {
    match provider.get() {
        Ok(annual_cost) if annual_cost.is_finite() && annual_cost > Money(0.0) => {
            ResolvedBaseline {
                annual_cost,
                fallback_used: false,
            }
        }
        Ok(annual_cost) => {
            warn!("Ignoring invalid baseline of {annual_cost}; using default");
            ResolvedBaseline {
                annual_cost: DEFAULT_BASELINE_COST,
                fallback_used: true,
            }
        }
        Err(err) => {
            warn!("{err}; using default baseline of {DEFAULT_BASELINE_COST}");
            ResolvedBaseline {
                annual_cost: DEFAULT_BASELINE_COST,
                fallback_used: true,
            }
        }
    }
}
