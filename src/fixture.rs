//! Fixtures for tests

use crate::baseline::BaselineProvider;
use crate::config::TransportationConfig;
use crate::cost_matrix::{BaselineReference, CostMatrix};
use crate::error::{PlanningError, PlanningResult};
use crate::facility::{
    CapacityMap, DemandMap, Destination, DestinationMap, Facility, FacilityMap,
    build_capacity_map, distribute_demand,
};
use crate::location::DistanceTable;
use crate::request::SweepRequest;
use crate::service::DistanceThreshold;
use crate::units::{Dimensionless, Miles, Money, Quantity};
use rstest::fixture;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Assert that a [`PlanningError`] of the given kind occurs
macro_rules! assert_planning_error {
    ($result:expr, $kind:ident) => {
        match $result {
            Err($crate::error::PlanningError::$kind(_)) => {}
            Err(err) => panic!("Expected {} error, got: {err}", stringify!($kind)),
            Ok(_) => panic!("Expected {} error, got Ok", stringify!($kind)),
        }
    };
}
pub(crate) use assert_planning_error;

/// A baseline provider whose lookup always fails
pub struct FailingBaselineProvider;

impl BaselineProvider for FailingBaselineProvider {
    fn get(&self) -> PlanningResult<Money> {
        Err(PlanningError::UpstreamUnavailable(
            "baseline service unreachable".into(),
        ))
    }
}

/// Candidate facilities "A" (mandatory), "B" and "C"
#[fixture]
pub fn facilities() -> FacilityMap {
    [("A", true), ("B", false), ("C", false)]
        .into_iter()
        .map(|(id, mandatory)| {
            let facility = Facility {
                id: id.into(),
                mandatory,
                fixed_cost: Money(250_000.0),
            };
            (facility.id.clone(), Rc::new(facility))
        })
        .collect()
}

/// Destinations "X" and "Y" with equal weights
#[fixture]
pub fn destinations() -> DestinationMap {
    ["X", "Y"]
        .into_iter()
        .map(|id| {
            let dest = Destination {
                id: id.into(),
                weight: Dimensionless(1.0),
            };
            (dest.id.clone(), dest)
        })
        .collect()
}

/// "A" and "B" are each close to one destination, "C" is far from both
#[fixture]
pub fn distance_table() -> DistanceTable {
    [
        ("A", "X", 100.0),
        ("A", "Y", 400.0),
        ("B", "X", 300.0),
        ("B", "Y", 100.0),
        ("C", "X", 900.0),
        ("C", "Y", 950.0),
    ]
    .into_iter()
    .collect()
}

#[fixture]
pub fn baseline() -> BaselineReference {
    BaselineReference {
        annual_cost: Money(100_000.0),
        annual_units: Quantity(1000.0),
    }
}

#[fixture]
pub fn cost_matrix(
    facilities: FacilityMap,
    destinations: DestinationMap,
    baseline: BaselineReference,
    distance_table: DistanceTable,
) -> CostMatrix {
    CostMatrix::build(
        &facilities,
        &destinations,
        &baseline,
        &TransportationConfig::default(),
        &distance_table,
    )
    .unwrap()
}

/// Capacities sized for a peak of 1000 units
#[fixture]
pub fn capacity_map(facilities: FacilityMap) -> CapacityMap {
    build_capacity_map(&facilities, Quantity(1000.0), Dimensionless(0.6))
}

/// 1000 units split equally between the destinations
#[fixture]
pub fn demand_map(destinations: DestinationMap) -> DemandMap {
    distribute_demand(&destinations, Quantity(1000.0))
}

#[fixture]
pub fn threshold() -> DistanceThreshold {
    DistanceThreshold {
        max_distance: Miles(800.0),
    }
}

/// A single-year request over the fixture locations, sweeping one node
#[fixture]
pub fn sweep_request() -> SweepRequest {
    serde_json::from_str(
        r#"{
            "scenario": {"minNodes": 1, "maxNodes": 1, "step": 1, "criterion": "total_cost"},
            "config": {"transportation": {"mandatory_facilities": ["A"]}},
            "forecast": [{"year": 2025, "annual_units": 1000}],
            "skus": [{"sku": "S1", "annual_volume": 1000, "units_per_case": 12, "cases_per_pallet": 40}],
            "candidateFacilities": ["A", "B", "C"],
            "destinations": ["X", "Y"]
        }"#,
    )
    .unwrap()
}
