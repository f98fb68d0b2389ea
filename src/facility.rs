//! Candidate facilities, destinations and the per-year demand and capacity maps built from them.
use crate::id::define_id_type;
use crate::units::{Dimensionless, Money, Quantity};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use std::rc::Rc;

define_id_type! {FacilityID}
define_id_type! {DestinationID}

/// A candidate location at which a facility could be opened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    /// Location name of the facility
    pub id: FacilityID,
    /// Whether the facility must be open in every solved network
    pub mandatory: bool,
    /// Fixed annual cost of keeping the facility open
    pub fixed_cost: Money,
}

/// A map of [`Facility`]s, keyed by ID, in candidate-list order
pub type FacilityMap = IndexMap<FacilityID, Rc<Facility>>;

/// A location to which demand must be delivered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Destination {
    /// Location name of the destination
    pub id: DestinationID,
    /// Relative share of annual demand arising at this destination
    pub weight: Dimensionless,
}

/// A map of [`Destination`]s, keyed by ID, in request order
pub type DestinationMap = IndexMap<DestinationID, Destination>;

/// Demand for a single year, per destination
pub type DemandMap = IndexMap<DestinationID, Quantity>;

/// Maximum annual throughput, per facility
pub type CapacityMap = IndexMap<FacilityID, Quantity>;

/// Split a year's total demand across destinations in proportion to their weights
pub fn distribute_demand(destinations: &DestinationMap, total: Quantity) -> DemandMap {
    let total_weight: Dimensionless = destinations.values().map(|dest| dest.weight).sum();

    destinations
        .values()
        .map(|dest| (dest.id.clone(), total * (dest.weight / total_weight)))
        .collect()
}

/// Choose the facilities offered to the solver for a scenario with the given number of nodes.
///
/// Every mandatory facility is kept, and the remaining places up to `nodes + headroom` go to the
/// earliest optional candidates. The result is in candidate order.
pub fn select_scenario_facilities(
    facilities: &FacilityMap,
    nodes: usize,
    headroom: usize,
) -> FacilityMap {
    let mandatory_count = facilities.values().filter(|facility| facility.mandatory).count();
    let mut optional_places = (nodes + headroom).saturating_sub(mandatory_count);
    let selected: FacilityMap = facilities
        .iter()
        .filter(|(_, facility)| {
            if facility.mandatory {
                return true;
            }
            if optional_places == 0 {
                return false;
            }
            optional_places -= 1;
            true
        })
        .map(|(id, facility)| (id.clone(), Rc::clone(facility)))
        .collect();

    debug!(
        "Scenario with {nodes} nodes considers facilities: {}",
        selected.keys().map(FacilityID::as_str).collect::<Vec<_>>().join("; ")
    );

    selected
}

/// Build the capacity map for a scenario's facilities.
///
/// The anchor facility (the first mandatory facility, else the first candidate) can serve the
/// whole peak demand on its own. Every other facility can handle `capacity_fraction` of it.
pub fn build_capacity_map(
    facilities: &FacilityMap,
    peak_demand: Quantity,
    capacity_fraction: Dimensionless,
) -> CapacityMap {
    let anchor = facilities
        .values()
        .find(|facility| facility.mandatory)
        .or_else(|| facilities.values().next())
        .map(|facility| facility.id.clone());

    facilities
        .keys()
        .map(|id| {
            let capacity = if anchor.as_ref() == Some(id) {
                peak_demand
            } else {
                peak_demand * capacity_fraction
            };
            (id.clone(), capacity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{destinations, facilities};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_distribute_demand_equal(destinations: DestinationMap) {
        let demand = distribute_demand(&destinations, Quantity(1000.0));
        assert_eq!(demand.len(), 2);
        for units in demand.values() {
            assert_approx_eq!(Quantity, *units, Quantity(500.0));
        }
    }

    #[test]
    fn test_distribute_demand_weighted() {
        let destinations: DestinationMap = [("X", 3.0), ("Y", 1.0)]
            .into_iter()
            .map(|(id, weight)| {
                let dest = Destination {
                    id: id.into(),
                    weight: Dimensionless(weight),
                };
                (dest.id.clone(), dest)
            })
            .collect();

        let demand = distribute_demand(&destinations, Quantity(100.0));
        assert_approx_eq!(Quantity, demand["X"], Quantity(75.0));
        assert_approx_eq!(Quantity, demand["Y"], Quantity(25.0));
        assert_approx_eq!(Quantity, demand.values().sum(), Quantity(100.0));
    }

    #[rstest]
    #[case(1, 0, &["A"])]
    #[case(1, 1, &["A", "B"])]
    #[case(1, 2, &["A", "B", "C"])]
    #[case(3, 2, &["A", "B", "C"])]
    fn test_select_scenario_facilities(
        facilities: FacilityMap,
        #[case] nodes: usize,
        #[case] headroom: usize,
        #[case] expected: &[&str],
    ) {
        let selected = select_scenario_facilities(&facilities, nodes, headroom);
        assert!(selected.keys().map(FacilityID::as_str).eq(expected.iter().copied()));
    }

    #[test]
    fn test_select_scenario_facilities_candidate_order() {
        let facilities: FacilityMap = [("P", false), ("Q", false), ("R", true)]
            .into_iter()
            .map(|(id, mandatory)| {
                let facility = Facility {
                    id: id.into(),
                    mandatory,
                    fixed_cost: Money(0.0),
                };
                (facility.id.clone(), facility.into())
            })
            .collect();

        let selected = select_scenario_facilities(&facilities, 1, 0);
        assert!(selected.keys().map(FacilityID::as_str).eq(["R"]));

        let selected = select_scenario_facilities(&facilities, 2, 0);
        assert!(selected.keys().map(FacilityID::as_str).eq(["P", "R"]));

        let selected = select_scenario_facilities(&facilities, 2, 1);
        assert!(selected.keys().map(FacilityID::as_str).eq(["P", "Q", "R"]));
    }

    #[rstest]
    fn test_build_capacity_map(facilities: FacilityMap) {
        let capacity = build_capacity_map(&facilities, Quantity(1000.0), Dimensionless(0.6));

        // "A" is mandatory so is the anchor
        assert_approx_eq!(Quantity, capacity["A"], Quantity(1000.0));
        assert_approx_eq!(Quantity, capacity["B"], Quantity(600.0));
        assert_approx_eq!(Quantity, capacity["C"], Quantity(600.0));
    }

    #[test]
    fn test_build_capacity_map_no_mandatory() {
        let facilities: FacilityMap = ["P", "Q"]
            .into_iter()
            .map(|id| {
                let facility = Facility {
                    id: id.into(),
                    mandatory: false,
                    fixed_cost: Money(0.0),
                };
                (facility.id.clone(), facility.into())
            })
            .collect();

        let capacity = build_capacity_map(&facilities, Quantity(10.0), Dimensionless(0.5));
        assert_approx_eq!(Quantity, capacity["P"], Quantity(10.0));
        assert_approx_eq!(Quantity, capacity["Q"], Quantity(5.0));
    }
}
