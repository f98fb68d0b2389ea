//! Defines the `PlanningConfig` struct, which represents the `config` section of a request.
//!
//! Every field is optional in the request. Missing fields take the documented default and every
//! supplied field is checked by [`PlanningConfig::validate`].
use crate::error::{PlanningResult, ensure_config};
use crate::input::{deserialise_proportion, deserialise_proportion_nonzero, is_sorted_and_unique};
use crate::service::{DistanceThreshold, LinearDecay, ServiceScoring};
use crate::units::{Dimensionless, Miles, Money, MoneyPerMile, MoneyPerQuantity};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

/// The per-mile rate at which the historical baseline spend was incurred
pub const REFERENCE_COST_PER_MILE: MoneyPerMile = MoneyPerMile(2.85);

// Transportation defaults
define_unit_param_default!(default_fixed_cost_per_facility, Money, 250_000.0);
define_param_default!(default_cost_per_mile, MoneyPerMile, REFERENCE_COST_PER_MILE);
define_unit_param_default!(default_service_level_requirement, Dimensionless, 0.95);
define_unit_param_default!(default_max_distance_miles, Miles, 800.0);
define_param_default!(default_max_facilities, usize, 10);
define_param_default!(default_lease_years, u32, 7);
define_unit_param_default!(default_switching_cost_per_facility, Money, 0.0);

/// The always-open set if the request doesn't specify one
fn default_mandatory_facilities() -> Vec<String> {
    vec!["Littleton, MA".to_string()]
}

// Warehouse defaults
define_param_default!(default_operating_days, u32, 260);
define_unit_param_default!(default_cost_per_unit_handled, MoneyPerQuantity, 0.85);
define_unit_param_default!(default_cost_per_pallet_position, Money, 180.0);
define_param_default!(default_days_of_supply, f64, 30.0);
define_unit_param_default!(default_unit_value, MoneyPerQuantity, 25.0);
define_unit_param_default!(default_carrying_cost_rate, Dimensionless, 0.22);

// Optimisation defaults
define_param_default!(default_cost_weight, f64, 0.7);
define_param_default!(default_service_weight, f64, 0.3);
define_unit_param_default!(default_capacity_fraction, Dimensionless, 0.6);
define_param_default!(default_candidate_headroom, usize, 2);
define_param_default!(default_time_limit_seconds, f64, 60.0);
define_param_default!(default_mip_relative_gap, f64, 1e-4);

/// The full configuration for a planning request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Parameters for the optimisation itself
    #[serde(default)]
    pub optimization: OptimizationConfig,
    /// Parameters used by the warehouse and inventory estimators
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    /// Parameters for the transportation network
    #[serde(default)]
    pub transportation: TransportationConfig,
}

/// Parameters for the transportation network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportationConfig {
    /// Fixed annual cost charged for every open facility
    #[serde(default = "default_fixed_cost_per_facility")]
    pub fixed_cost_per_facility: Money,
    /// Routing cost per mile travelled
    #[serde(default = "default_cost_per_mile")]
    pub cost_per_mile: MoneyPerMile,
    /// The service level the network is expected to achieve
    #[serde(default = "default_service_level_requirement")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub service_level_requirement: Dimensionless,
    /// Destinations further than this from their facility count as not served on time
    #[serde(default = "default_max_distance_miles")]
    pub max_distance_miles: Miles,
    /// Upper bound on the number of facilities in any scenario
    #[serde(default = "default_max_facilities")]
    pub max_facilities: usize,
    /// Facilities which must be open in every solved network
    #[serde(default = "default_mandatory_facilities")]
    pub mandatory_facilities: Vec<String>,
    /// Contractual commitment length for a facility lease, in years
    #[serde(default = "default_lease_years")]
    pub lease_years: u32,
    /// Penalty charged whenever a facility is opened or closed between consecutive years
    #[serde(default = "default_switching_cost_per_facility")]
    pub switching_cost_per_facility: Money,
}

impl Default for TransportationConfig {
    fn default() -> Self {
        Self {
            fixed_cost_per_facility: default_fixed_cost_per_facility(),
            cost_per_mile: default_cost_per_mile(),
            service_level_requirement: default_service_level_requirement(),
            max_distance_miles: default_max_distance_miles(),
            max_facilities: default_max_facilities(),
            mandatory_facilities: default_mandatory_facilities(),
            lease_years: default_lease_years(),
            switching_cost_per_facility: default_switching_cost_per_facility(),
        }
    }
}

/// Parameters used by the warehouse and inventory estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Number of working days per year
    #[serde(default = "default_operating_days")]
    pub operating_days: u32,
    /// Handling cost for each unit passing through the network
    #[serde(default = "default_cost_per_unit_handled")]
    pub cost_per_unit_handled: MoneyPerQuantity,
    /// Annual cost of one pallet position
    #[serde(default = "default_cost_per_pallet_position")]
    pub cost_per_pallet_position: Money,
    /// Days of demand held in stock
    #[serde(default = "default_days_of_supply")]
    pub days_of_supply: f64,
    /// Value of a single unit of stock
    #[serde(default = "default_unit_value")]
    pub unit_value: MoneyPerQuantity,
    /// Annual carrying cost as a fraction of stock value
    #[serde(default = "default_carrying_cost_rate")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub carrying_cost_rate: Dimensionless,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            operating_days: default_operating_days(),
            cost_per_unit_handled: default_cost_per_unit_handled(),
            cost_per_pallet_position: default_cost_per_pallet_position(),
            days_of_supply: default_days_of_supply(),
            unit_value: default_unit_value(),
            carrying_cost_rate: default_carrying_cost_rate(),
        }
    }
}

/// Parameters for the optimisation itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Weight given to (normalised) cost in the objective
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,
    /// Weight given to weighted service level in the objective
    #[serde(default = "default_service_weight")]
    pub service_weight: f64,
    /// Capacity of non-anchor facilities as a fraction of peak total demand
    #[serde(default = "default_capacity_fraction")]
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub capacity_fraction: Dimensionless,
    /// How many candidates beyond the scenario's node count are offered to the solver
    #[serde(default = "default_candidate_headroom")]
    pub candidate_headroom: usize,
    /// Wall-clock budget for a single solve, in seconds
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: f64,
    /// Relative optimality gap at which the solver may stop
    #[serde(default = "default_mip_relative_gap")]
    pub mip_relative_gap: f64,
    /// How service achievement is scored from distance
    #[serde(default)]
    pub service_scoring: ServiceScoringKind,
    /// Whether to echo the solver's own log output
    #[serde(default)]
    pub solver_log: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            cost_weight: default_cost_weight(),
            service_weight: default_service_weight(),
            capacity_fraction: default_capacity_fraction(),
            candidate_headroom: default_candidate_headroom(),
            time_limit_seconds: default_time_limit_seconds(),
            mip_relative_gap: default_mip_relative_gap(),
            service_scoring: ServiceScoringKind::default(),
            solver_log: false,
        }
    }
}

/// The available policies for scoring service achievement
#[derive(
    Debug, Clone, Copy, PartialEq, Default, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum ServiceScoringKind {
    /// Served on time if within the maximum distance, otherwise not
    #[default]
    #[string = "threshold"]
    Threshold,
    /// Full service up to the maximum distance, decaying linearly to zero at twice that
    #[string = "linear_decay"]
    LinearDecay,
}

impl ServiceScoringKind {
    /// Create the scoring policy for the given maximum distance
    pub fn scoring(self, max_distance: Miles) -> Box<dyn ServiceScoring> {
        match self {
            Self::Threshold => Box::new(DistanceThreshold { max_distance }),
            Self::LinearDecay => Box::new(LinearDecay::new(max_distance)),
        }
    }
}

/// Check that a monetary rate is a finite, non-negative number
fn check_non_negative(name: &str, value: f64) -> PlanningResult<()> {
    ensure_config!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that a value is a finite, strictly positive number
fn check_positive(name: &str, value: f64) -> PlanningResult<()> {
    ensure_config!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

impl TransportationConfig {
    /// Validate parameters after reading in the request
    fn validate(&self) -> PlanningResult<()> {
        check_non_negative(
            "transportation.fixed_cost_per_facility",
            self.fixed_cost_per_facility.value(),
        )?;
        check_positive("transportation.cost_per_mile", self.cost_per_mile.value())?;
        check_positive(
            "transportation.max_distance_miles",
            self.max_distance_miles.value(),
        )?;
        ensure_config!(
            self.max_facilities >= 1,
            "transportation.max_facilities must be at least 1"
        );
        ensure_config!(
            self.lease_years >= 1,
            "transportation.lease_years must be at least 1"
        );
        check_non_negative(
            "transportation.switching_cost_per_facility",
            self.switching_cost_per_facility.value(),
        )?;

        // Mandatory facilities must be unique
        let sorted = self.mandatory_facilities.iter().sorted().collect_vec();
        ensure_config!(
            is_sorted_and_unique(sorted),
            "transportation.mandatory_facilities contains duplicate entries"
        );

        Ok(())
    }
}

impl WarehouseConfig {
    /// Validate parameters after reading in the request
    fn validate(&self) -> PlanningResult<()> {
        ensure_config!(
            (1..=366).contains(&self.operating_days),
            "warehouse.operating_days must be between 1 and 366"
        );
        check_non_negative(
            "warehouse.cost_per_unit_handled",
            self.cost_per_unit_handled.value(),
        )?;
        check_non_negative(
            "warehouse.cost_per_pallet_position",
            self.cost_per_pallet_position.value(),
        )?;
        check_non_negative("warehouse.days_of_supply", self.days_of_supply)?;
        check_non_negative("warehouse.unit_value", self.unit_value.value())?;

        // carrying_cost_rate already validated with deserialise_proportion

        Ok(())
    }
}

impl OptimizationConfig {
    /// Validate parameters after reading in the request
    fn validate(&self) -> PlanningResult<()> {
        check_non_negative("optimization.cost_weight", self.cost_weight)?;
        check_non_negative("optimization.service_weight", self.service_weight)?;
        ensure_config!(
            self.cost_weight + self.service_weight > 0.0,
            "optimization.cost_weight and optimization.service_weight cannot both be zero"
        );
        check_positive(
            "optimization.time_limit_seconds",
            self.time_limit_seconds,
        )?;
        check_non_negative("optimization.mip_relative_gap", self.mip_relative_gap)?;

        // capacity_fraction already validated with deserialise_proportion_nonzero

        Ok(())
    }
}

impl PlanningConfig {
    /// Validate every section of the configuration
    pub fn validate(&self) -> PlanningResult<()> {
        self.optimization.validate()?;
        self.warehouse.validate()?;
        self.transportation.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanningError;
    use rstest::rstest;

    /// Parse a config from JSON, panicking on deserialisation errors
    fn parse(json: &str) -> PlanningConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_match_serde_defaults() {
        assert_eq!(parse("{}"), PlanningConfig::default());
        assert_eq!(
            parse(r#"{"transportation": {}, "warehouse": {}, "optimization": {}}"#),
            PlanningConfig::default()
        );
    }

    #[test]
    fn test_documented_defaults() {
        let config = PlanningConfig::default();
        let transport = &config.transportation;
        assert_eq!(transport.fixed_cost_per_facility, Money(250_000.0));
        assert_eq!(transport.cost_per_mile, MoneyPerMile(2.85));
        assert_eq!(transport.service_level_requirement, Dimensionless(0.95));
        assert_eq!(transport.max_distance_miles, Miles(800.0));
        assert_eq!(transport.max_facilities, 10);
        assert_eq!(transport.mandatory_facilities, ["Littleton, MA"]);
        assert_eq!(transport.lease_years, 7);
        assert_eq!(config.warehouse.operating_days, 260);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = parse(
            r#"{"transportation": {"cost_per_mile": 3.5, "mandatory_facilities": []},
                "optimization": {"service_scoring": "linear_decay"}}"#,
        );
        assert_eq!(config.transportation.cost_per_mile, MoneyPerMile(3.5));
        assert!(config.transportation.mandatory_facilities.is_empty());
        assert_eq!(config.transportation.lease_years, 7); // untouched
        assert_eq!(
            config.optimization.service_scoring,
            ServiceScoringKind::LinearDecay
        );
    }

    #[test]
    fn test_wrong_type_rejected() {
        let result: Result<PlanningConfig, _> =
            serde_json::from_str(r#"{"transportation": {"lease_years": "seven"}}"#);
        assert!(result.is_err());

        let result: Result<PlanningConfig, _> =
            serde_json::from_str(r#"{"transportation": {"service_level_requirement": 1.5}}"#);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(r#"{"transportation": {"cost_per_mile": 0}}"#, "transportation.cost_per_mile")]
    #[case(r#"{"transportation": {"fixed_cost_per_facility": -1}}"#, "transportation.fixed_cost_per_facility")]
    #[case(r#"{"transportation": {"max_facilities": 0}}"#, "transportation.max_facilities")]
    #[case(r#"{"transportation": {"lease_years": 0}}"#, "transportation.lease_years")]
    #[case(r#"{"transportation": {"mandatory_facilities": ["A", "A"]}}"#, "duplicate")]
    #[case(r#"{"warehouse": {"operating_days": 0}}"#, "warehouse.operating_days")]
    #[case(r#"{"optimization": {"cost_weight": 0, "service_weight": 0}}"#, "cannot both be zero")]
    #[case(r#"{"optimization": {"time_limit_seconds": 0}}"#, "time_limit_seconds")]
    fn test_validate_invalid(#[case] json: &str, #[case] fragment: &str) {
        let err = parse(json).validate().unwrap_err();
        assert!(matches!(err, PlanningError::Configuration(_)));
        assert!(
            err.to_string().contains(fragment),
            "Unexpected error message: {err}"
        );
    }
}
