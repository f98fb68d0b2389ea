//! The sweep request and its validation into a [`PlanningInput`].
//!
//! A request is deserialised leniently (most fields have defaults) and then checked in one place
//! by [`SweepRequest::validate`]. Anything wrong with it is reported as a
//! [`PlanningError::Configuration`] before any solving happens.
use crate::config::PlanningConfig;
use crate::error::{PlanningError, PlanningResult, ensure_config};
use crate::facility::{Destination, DestinationID, DestinationMap, Facility, FacilityMap};
use crate::forecast::{Forecast, ForecastYear};
use crate::id::{IDCollection, define_id_type};
use crate::location::Coordinates;
use crate::units::{Dimensionless, Quantity};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::rc::Rc;

define_id_type! {SkuID}

/// How the best scenario is chosen from a sweep
#[derive(
    Debug, Clone, Copy, PartialEq, Default, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum Criterion {
    /// Lowest total cost, then highest service
    #[default]
    #[string = "total_cost"]
    TotalCost,
    /// Highest service, then lowest total cost
    #[string = "service_then_cost"]
    ServiceThenCost,
}

/// The range of network sizes to sweep over
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRange {
    /// Smallest network size
    #[serde(default = "default_min_nodes")]
    pub min_nodes: usize,
    /// Largest network size (defaults to `transportation.max_facilities`)
    #[serde(default)]
    pub max_nodes: Option<usize>,
    /// Increment between network sizes
    #[serde(default = "default_step")]
    pub step: usize,
    /// How to pick the best scenario
    #[serde(default)]
    pub criterion: Criterion,
}

fn default_min_nodes() -> usize {
    1
}

fn default_step() -> usize {
    1
}

impl Default for ScenarioRange {
    fn default() -> Self {
        Self {
            min_nodes: default_min_nodes(),
            max_nodes: None,
            step: default_step(),
            criterion: Criterion::default(),
        }
    }
}

impl ScenarioRange {
    /// The network sizes to sweep over, in order.
    ///
    /// `max_facilities` is the upper bound only when `max_nodes` isn't given.
    pub fn node_counts(&self, max_facilities: usize) -> PlanningResult<Vec<usize>> {
        ensure_config!(self.min_nodes >= 1, "scenario.minNodes must be at least 1");
        ensure_config!(self.step >= 1, "scenario.step must be at least 1");

        let max_nodes = self.max_nodes.unwrap_or(max_facilities);
        ensure_config!(
            max_nodes >= self.min_nodes,
            "scenario.maxNodes ({max_nodes}) must be at least scenario.minNodes ({})",
            self.min_nodes
        );

        Ok((self.min_nodes..=max_nodes).step_by(self.step).collect())
    }
}

/// A stock-keeping unit handled by the network
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sku {
    /// SKU identifier
    pub sku: SkuID,
    /// Units of this SKU moved per year
    pub annual_volume: Quantity,
    /// Units packed in a case
    #[serde(default)]
    pub units_per_case: Option<f64>,
    /// Cases stacked on a pallet
    #[serde(default)]
    pub cases_per_pallet: Option<f64>,
}

impl Sku {
    /// Units per pallet, if the packing is known
    pub fn units_per_pallet(&self) -> Option<f64> {
        Some(self.units_per_case? * self.cases_per_pallet?)
    }

    fn validate(&self) -> PlanningResult<()> {
        ensure_config!(
            self.annual_volume.is_finite() && self.annual_volume >= Quantity(0.0),
            "SKU {} must have a non-negative annual_volume",
            self.sku
        );
        for value in [self.units_per_case, self.cases_per_pallet].into_iter().flatten() {
            ensure_config!(
                value.is_finite() && value > 0.0,
                "SKU {} must have positive packing quantities",
                self.sku
            );
        }

        Ok(())
    }
}

/// A request to sweep over a range of network sizes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRequest {
    /// Range of network sizes to evaluate
    #[serde(default)]
    pub scenario: ScenarioRange,
    /// Overrides for the planning configuration
    #[serde(default)]
    pub config: PlanningConfig,
    /// Annual demand over the planning horizon
    #[serde(default)]
    pub forecast: Vec<ForecastYear>,
    /// SKUs handled by the network
    #[serde(default)]
    pub skus: Vec<Sku>,
    /// Locations where a facility could be opened
    #[serde(default)]
    pub candidate_facilities: Vec<String>,
    /// Locations to which demand is delivered
    #[serde(default)]
    pub destinations: Vec<String>,
    /// Relative demand share per destination (equal if omitted)
    #[serde(default)]
    pub destination_weights: IndexMap<String, f64>,
    /// Coordinates for locations not in the built-in catalogue
    #[serde(default)]
    pub locations: IndexMap<String, Coordinates>,
}

/// A validated request, ready for planning
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningInput {
    /// The planning configuration
    pub config: PlanningConfig,
    /// The demand forecast
    pub forecast: Forecast,
    /// SKUs handled by the network
    pub skus: Vec<Sku>,
    /// Candidate facilities, in request order
    pub facilities: FacilityMap,
    /// Destinations, in request order
    pub destinations: DestinationMap,
    /// Extra location coordinates
    pub locations: IndexMap<String, Coordinates>,
    /// Network sizes to evaluate, in sweep order
    pub node_counts: Vec<usize>,
    /// How to pick the best scenario
    pub criterion: Criterion,
}

/// Check a list of location names, returning them trimmed
fn check_location_names(names: &[String], field: &str) -> PlanningResult<Vec<String>> {
    ensure_config!(!names.is_empty(), "{field} must contain at least one location");

    let names = names.iter().map(|name| name.trim().to_string()).collect_vec();
    ensure_config!(
        names.iter().all(|name| !name.is_empty()),
        "{field} contains an empty location name"
    );
    if let Some(dup) = names.iter().duplicates().next() {
        return Err(PlanningError::Configuration(format!(
            "{field} contains duplicate location {dup}"
        )));
    }

    Ok(names)
}

impl SweepRequest {
    /// Check the request and convert it into a [`PlanningInput`]
    pub fn validate(self) -> PlanningResult<PlanningInput> {
        self.config.validate()?;
        let facilities = self.build_facilities()?;
        let destinations = self.build_destinations()?;
        for sku in &self.skus {
            sku.validate()?;
        }
        let node_counts = self
            .scenario
            .node_counts(self.config.transportation.max_facilities)?;
        let forecast = Forecast::new(self.forecast)?;

        Ok(PlanningInput {
            config: self.config,
            forecast,
            skus: self.skus,
            facilities,
            destinations,
            locations: self.locations,
            node_counts,
            criterion: self.scenario.criterion,
        })
    }

    /// Build the candidate facilities, flagging the mandatory ones
    fn build_facilities(&self) -> PlanningResult<FacilityMap> {
        let names = check_location_names(&self.candidate_facilities, "candidateFacilities")?;
        let transport = &self.config.transportation;

        for name in &transport.mandatory_facilities {
            if !names.contains(name) {
                warn!("Mandatory facility {name} is not a candidate facility; ignoring");
            }
        }

        Ok(names
            .into_iter()
            .map(|name| {
                let facility = Facility {
                    mandatory: transport.mandatory_facilities.contains(&name),
                    id: name.into(),
                    fixed_cost: transport.fixed_cost_per_facility,
                };
                (facility.id.clone(), Rc::new(facility))
            })
            .collect())
    }

    /// Build the destinations along with their demand weights
    fn build_destinations(&self) -> PlanningResult<DestinationMap> {
        let ids: IndexSet<DestinationID> = check_location_names(&self.destinations, "destinations")?
            .into_iter()
            .map(DestinationID::from)
            .collect();

        let mut weights: IndexMap<DestinationID, Dimensionless> = IndexMap::new();
        for (name, &weight) in &self.destination_weights {
            let id = ids
                .get_id_by_str(name.trim())
                .map_err(|err| PlanningError::Configuration(format!("destinationWeights: {err}")))?;
            ensure_config!(
                weight.is_finite() && weight > 0.0,
                "destinationWeights: weight for {name} must be a positive number"
            );
            weights.insert(id, Dimensionless(weight));
        }
        if !weights.is_empty() && weights.len() < ids.len() {
            warn!("destinationWeights does not cover every destination; missing ones get weight 1");
        }

        Ok(ids
            .into_iter()
            .map(|id| {
                let weight = weights.get(&id).copied().unwrap_or(Dimensionless(1.0));
                (id.clone(), Destination { id, weight })
            })
            .collect())
    }
}
