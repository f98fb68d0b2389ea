//! The facility-to-destination cost matrix.
//!
//! The matrix is built once per request and shared read-only by every year and scenario. Unit costs
//! are anchored to the historical baseline: serving every destination from its cheapest candidate
//! at baseline volume and at [`REFERENCE_COST_PER_MILE`] reproduces the baseline spend. Other
//! per-mile rates scale unit costs in proportion.
use crate::config::{REFERENCE_COST_PER_MILE, TransportationConfig};
use crate::error::{PlanningError, PlanningResult, ensure_config};
use crate::facility::{DestinationID, DestinationMap, FacilityID, FacilityMap};
use crate::location::DistanceSource;
use crate::units::{Dimensionless, Miles, Money, MoneyPerQuantity, Quantity};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// The historical transportation spend which unit costs are anchored to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineReference {
    /// Annual transportation spend
    pub annual_cost: Money,
    /// Units moved for that spend
    pub annual_units: Quantity,
}

impl BaselineReference {
    /// Historical cost of moving a single unit
    pub fn cost_per_unit(&self) -> MoneyPerQuantity {
        self.annual_cost / self.annual_units
    }
}

/// Cost and distance of serving a destination from a facility
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEntry {
    /// Road distance between facility and destination
    pub distance: Miles,
    /// Routing cost of a single trip along the lane
    pub lane_cost: Money,
    /// Cost of serving one unit of demand along the lane
    pub cost_per_unit: MoneyPerQuantity,
}

/// Costs for every (facility, destination) pair, plus each facility's fixed cost
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    entries: IndexMap<(FacilityID, DestinationID), CostEntry>,
    fixed_costs: IndexMap<FacilityID, Money>,
}

impl CostMatrix {
    /// Build the cost matrix for all candidate facilities and destinations.
    ///
    /// # Arguments
    ///
    /// * `facilities` - Candidate facilities
    /// * `destinations` - Destinations to be served
    /// * `baseline` - Historical spend to anchor unit costs to
    /// * `transport` - Transportation parameters
    /// * `distances` - Source of road distances
    ///
    /// # Returns
    ///
    /// The matrix, or an error if any location can't be resolved.
    pub fn build(
        facilities: &FacilityMap,
        destinations: &DestinationMap,
        baseline: &BaselineReference,
        transport: &TransportationConfig,
        distances: &dyn DistanceSource,
    ) -> PlanningResult<Self> {
        ensure_config!(
            !facilities.is_empty(),
            "At least one candidate facility is required"
        );
        ensure_config!(
            !destinations.is_empty(),
            "At least one destination is required"
        );
        ensure_config!(
            baseline.annual_units > Quantity(0.0) && baseline.annual_cost.is_finite(),
            "Baseline must cover a positive number of units"
        );

        // Lane costs first, as the anchoring depends on all of them
        let mut lanes = IndexMap::new();
        for facility_id in facilities.keys() {
            for dest_id in destinations.keys() {
                let distance = distances.distance(facility_id.as_str(), dest_id.as_str())?;
                lanes.insert(
                    (facility_id.clone(), dest_id.clone()),
                    (distance, transport.cost_per_mile * distance),
                );
            }
        }

        // Mean over destinations of the cheapest lane serving each one
        let reference_lane = destinations
            .keys()
            .map(|dest_id| {
                facilities
                    .keys()
                    .map(|facility_id| lanes[&(facility_id.clone(), dest_id.clone())].1)
                    .fold(Money(f64::INFINITY), Money::min)
            })
            .sum::<Money>()
            / Dimensionless(destinations.len() as f64);
        debug!("Reference lane cost for baseline anchoring: {reference_lane}");

        let baseline_cost_per_unit = baseline.cost_per_unit();
        let rate_factor = transport.cost_per_mile / REFERENCE_COST_PER_MILE;
        let entries = lanes
            .into_iter()
            .map(|(key, (distance, lane_cost))| {
                let relative_cost = if reference_lane > Money(0.0) {
                    lane_cost / reference_lane
                } else {
                    Dimensionless(1.0)
                };
                let entry = CostEntry {
                    distance,
                    lane_cost,
                    cost_per_unit: baseline_cost_per_unit * relative_cost * rate_factor,
                };
                (key, entry)
            })
            .collect();

        let fixed_costs = facilities
            .values()
            .map(|facility| (facility.id.clone(), facility.fixed_cost))
            .collect();

        Ok(Self {
            entries,
            fixed_costs,
        })
    }

    /// Look up the entry for a facility and destination
    pub fn get(
        &self,
        facility_id: &FacilityID,
        destination_id: &DestinationID,
    ) -> PlanningResult<&CostEntry> {
        self.entries
            .get(&(facility_id.clone(), destination_id.clone()))
            .ok_or_else(|| {
                PlanningError::UnresolvedLocation(format!(
                    "No cost entry for facility {facility_id} and destination {destination_id}"
                ))
            })
    }

    /// The fixed annual cost of the given facility
    pub fn fixed_cost(&self, facility_id: &FacilityID) -> PlanningResult<Money> {
        self.fixed_costs.get(facility_id).copied().ok_or_else(|| {
            PlanningError::UnresolvedLocation(format!("No fixed cost for facility {facility_id}"))
        })
    }

    /// Iterate over all entries in the matrix
    pub fn iter(&self) -> impl Iterator<Item = (&FacilityID, &DestinationID, &CostEntry)> {
        self.entries
            .iter()
            .map(|((facility_id, dest_id), entry)| (facility_id, dest_id, entry))
    }
}
