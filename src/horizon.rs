//! Solving the network over every year of the planning horizon.
use crate::config::TransportationConfig;
use crate::error::PlanningResult;
use crate::facility::{DestinationMap, FacilityID, distribute_demand};
use crate::forecast::Forecast;
use crate::solver::{
    Bounds, Network, SolveOptions, YearSolution, solve_year, solve_year_with_open_set,
};
use crate::units::{Dimensionless, Money, MoneyPerQuantity, Quantity};
use indexmap::IndexSet;
use log::{debug, info};
use serde::Serialize;

/// How facility commitments are made across the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeasePolicy {
    /// One set of facilities is committed for the whole horizon
    FixedLease,
    /// The open set is re-optimised every year
    YearByYear,
}

impl LeasePolicy {
    /// The policy for a lease of the given length over a horizon of the given length
    pub fn select(lease_years: u32, horizon_len: usize) -> Self {
        if lease_years as usize >= horizon_len {
            Self::FixedLease
        } else {
            Self::YearByYear
        }
    }
}

/// The solved network for one year of the horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearResult {
    /// Calendar year
    pub year: u32,
    /// Total demand in the year
    pub demand: Quantity,
    /// The solution for the year
    #[serde(flatten)]
    pub solution: YearSolution,
    /// Facilities opened or closed since the previous year
    pub facility_changes: usize,
    /// Penalty charged for those changes
    pub switching_cost: Money,
}

/// Aggregate figures for a whole plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanTotals {
    /// Sum of every year's routing and fixed cost
    pub total_transportation_cost: Money,
    /// Sum of every year's switching cost
    pub switching_cost: Money,
    /// Demand-weighted service level over the horizon
    pub weighted_service_level: Dimensionless,
    /// Total cost divided by total units
    pub avg_cost_per_unit: MoneyPerQuantity,
    /// Units moved over the horizon
    pub total_units: Quantity,
    /// Number of facilities open in the first year
    pub facilities_opened_year1: usize,
}

/// The solved network over the whole horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkPlan {
    /// The lease policy used
    pub policy: LeasePolicy,
    /// Result for each year, in order
    pub years: Vec<YearResult>,
    /// Aggregate figures
    pub totals: PlanTotals,
}

impl NetworkPlan {
    /// Transportation cost including switching
    pub fn total_cost(&self) -> Money {
        self.totals.total_transportation_cost + self.totals.switching_cost
    }

    /// The facilities open in the first year
    pub fn first_year_facilities(&self) -> Vec<FacilityID> {
        self.years
            .first()
            .map(|year| year.solution.summary.open_facilities.clone())
            .unwrap_or_default()
    }
}

/// Everything needed to solve a single year, apart from the year's demand
pub struct HorizonContext<'a> {
    /// Facilities, capacities and costs
    pub network: Network<'a>,
    /// Destinations and their demand weights
    pub destinations: &'a DestinationMap,
    /// Bounds on the number of open facilities
    pub bounds: Bounds,
    /// Options for each solve
    pub options: &'a SolveOptions<'a>,
}

/// Solve the network for every year of the forecast.
///
/// # Arguments
///
/// * `transport` - Transportation parameters (lease length and switching cost)
/// * `forecast` - Demand forecast for the horizon
/// * `context` - Network, destinations, bounds and solve options
///
/// # Returns
///
/// The plan, or the first error encountered (with the year attached). Years are never skipped.
pub fn solve_horizon(
    transport: &TransportationConfig,
    forecast: &Forecast,
    context: &HorizonContext,
) -> PlanningResult<NetworkPlan> {
    let policy = LeasePolicy::select(transport.lease_years, forecast.len());
    info!(
        "Solving {}-year horizon with {policy} policy ({} facilities)",
        forecast.len(),
        context.bounds.max_facilities
    );

    let solutions = match policy {
        LeasePolicy::FixedLease => solve_fixed_lease(forecast, context)?,
        LeasePolicy::YearByYear => solve_year_by_year(forecast, context)?,
    };

    let mut years = Vec::with_capacity(solutions.len());
    let mut previous: Option<IndexSet<FacilityID>> = None;
    for (fy, solution) in forecast.iter().zip(solutions) {
        let open = solution.open_set();
        let facility_changes = previous
            .as_ref()
            .map_or(0, |prev| prev.symmetric_difference(&open).count());
        let switching_cost =
            transport.switching_cost_per_facility * Dimensionless(facility_changes as f64);
        if facility_changes > 0 {
            debug!("{facility_changes} facility changes in {}", fy.year);
        }

        years.push(YearResult {
            year: fy.year,
            demand: fy.annual_units,
            solution,
            facility_changes,
            switching_cost,
        });
        previous = Some(open);
    }

    let totals = aggregate(&years);
    Ok(NetworkPlan {
        policy,
        years,
        totals,
    })
}

/// Solve the demand for a single year
fn solve_single_year(
    year: u32,
    annual_units: Quantity,
    open: Option<&IndexSet<FacilityID>>,
    context: &HorizonContext,
) -> PlanningResult<YearSolution> {
    debug!("Solving network for {year}");
    let demand = distribute_demand(context.destinations, annual_units);
    let result = match open {
        Some(open) => solve_year_with_open_set(context.network, &demand, open, context.options),
        None => solve_year(context.network, &demand, context.bounds, context.options),
    };

    result.map_err(|err| err.context(format!("Year {year}")))
}

/// Choose the open set on the peak year, then solve every year with that set
fn solve_fixed_lease(
    forecast: &Forecast,
    context: &HorizonContext,
) -> PlanningResult<Vec<YearSolution>> {
    let peak = forecast.peak();
    let open = solve_single_year(peak.year, peak.annual_units, None, context)?.open_set();
    debug!(
        "Committing to {} facilities selected on peak year {}",
        open.len(),
        peak.year
    );

    forecast
        .iter()
        .map(|fy| solve_single_year(fy.year, fy.annual_units, Some(&open), context))
        .collect()
}

/// Solve every year independently
fn solve_year_by_year(
    forecast: &Forecast,
    context: &HorizonContext,
) -> PlanningResult<Vec<YearSolution>> {
    forecast
        .iter()
        .map(|fy| solve_single_year(fy.year, fy.annual_units, None, context))
        .collect()
}

/// Aggregate per-year results into plan totals
fn aggregate(years: &[YearResult]) -> PlanTotals {
    let total_transportation_cost: Money =
        years.iter().map(|year| year.solution.summary.total_cost).sum();
    let switching_cost: Money = years.iter().map(|year| year.switching_cost).sum();
    let total_units: Quantity = years.iter().map(|year| year.demand).sum();
    let weighted_service_level = Dimensionless(
        years
            .iter()
            .map(|year| year.solution.summary.weighted_service_level.value() * year.demand.value())
            .sum::<f64>()
            / total_units.value(),
    );

    PlanTotals {
        total_transportation_cost,
        switching_cost,
        weighted_service_level,
        avg_cost_per_unit: (total_transportation_cost + switching_cost) / total_units,
        total_units,
        facilities_opened_year1: years
            .first()
            .map_or(0, |year| year.solution.summary.facilities_opened),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizationConfig;
    use crate::cost_matrix::CostMatrix;
    use crate::facility::{CapacityMap, FacilityMap, build_capacity_map};
    use crate::fixture::{assert_planning_error, cost_matrix, destinations, facilities, threshold};
    use crate::forecast::ForecastYear;
    use crate::service::DistanceThreshold;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn forecast(units: &[f64]) -> Forecast {
        Forecast::new(
            units
                .iter()
                .zip(2025..)
                .map(|(&units, year)| ForecastYear {
                    year,
                    annual_units: Quantity(units),
                })
                .collect(),
        )
        .unwrap()
    }

    /// Solve the horizon with the fixture network and the given bounds
    fn solve(
        transport: &TransportationConfig,
        forecast: &Forecast,
        bounds: Bounds,
        facilities: &FacilityMap,
        destinations: &DestinationMap,
        cost_matrix: &CostMatrix,
        threshold: &DistanceThreshold,
    ) -> PlanningResult<NetworkPlan> {
        let capacity: CapacityMap =
            build_capacity_map(facilities, forecast.peak().annual_units, Dimensionless(0.6));
        let options = SolveOptions::from_config(&OptimizationConfig::default(), threshold);
        let context = HorizonContext {
            network: Network {
                facilities,
                capacity: &capacity,
                cost_matrix,
            },
            destinations,
            bounds,
            options: &options,
        };
        solve_horizon(transport, forecast, &context)
    }

    #[rstest]
    #[case(7, 1, LeasePolicy::FixedLease)]
    #[case(7, 7, LeasePolicy::FixedLease)]
    #[case(3, 7, LeasePolicy::YearByYear)]
    fn test_lease_policy_select(
        #[case] lease_years: u32,
        #[case] horizon_len: usize,
        #[case] expected: LeasePolicy,
    ) {
        assert_eq!(LeasePolicy::select(lease_years, horizon_len), expected);
    }

    #[rstest]
    fn test_fixed_lease_same_open_set(
        facilities: FacilityMap,
        destinations: DestinationMap,
        cost_matrix: CostMatrix,
        threshold: DistanceThreshold,
    ) {
        let transport = TransportationConfig::default();
        let forecast = forecast(&[500.0, 3000.0, 1000.0]);
        let plan = solve(
            &transport,
            &forecast,
            Bounds::new(1, 3).unwrap(),
            &facilities,
            &destinations,
            &cost_matrix,
            &threshold,
        )
        .unwrap();

        assert_eq!(plan.policy, LeasePolicy::FixedLease);
        assert_eq!(plan.years.len(), 3);
        let first = plan.years[0].solution.open_set();
        for year in &plan.years {
            assert_eq!(year.solution.open_set(), first);
            assert_eq!(year.facility_changes, 0);
        }
        // Chosen on the peak year, where B pays for itself
        assert!(first.contains("A") && first.contains("B"));
        assert_eq!(plan.totals.total_units, Quantity(4500.0));
        assert_eq!(plan.totals.facilities_opened_year1, 2);
    }

    #[rstest]
    fn test_year_by_year_switching(
        facilities: FacilityMap,
        destinations: DestinationMap,
        cost_matrix: CostMatrix,
        threshold: DistanceThreshold,
    ) {
        let transport = TransportationConfig {
            lease_years: 1,
            switching_cost_per_facility: Money(1000.0),
            ..TransportationConfig::default()
        };
        let forecast = forecast(&[500.0, 3000.0]);
        let plan = solve(
            &transport,
            &forecast,
            Bounds::new(1, 3).unwrap(),
            &facilities,
            &destinations,
            &cost_matrix,
            &threshold,
        )
        .unwrap();

        assert_eq!(plan.policy, LeasePolicy::YearByYear);
        assert_eq!(
            plan.years[0].solution.summary.open_facilities,
            [FacilityID::from("A")]
        );
        assert_eq!(
            plan.years[1].solution.summary.open_facilities,
            [FacilityID::from("A"), FacilityID::from("B")]
        );
        assert_eq!(plan.years[1].facility_changes, 1);
        assert_eq!(plan.totals.switching_cost, Money(1000.0));
        assert_approx_eq!(
            Money,
            plan.total_cost(),
            plan.totals.total_transportation_cost + Money(1000.0)
        );
    }

    #[rstest]
    fn test_mandatory_open_every_year(
        facilities: FacilityMap,
        destinations: DestinationMap,
        cost_matrix: CostMatrix,
        threshold: DistanceThreshold,
    ) {
        let transport = TransportationConfig {
            lease_years: 1,
            ..TransportationConfig::default()
        };
        let forecast = forecast(&[1000.0, 1200.0, 1400.0]);
        let plan = solve(
            &transport,
            &forecast,
            Bounds::exact(2),
            &facilities,
            &destinations,
            &cost_matrix,
            &threshold,
        )
        .unwrap();

        for year in &plan.years {
            assert!(year.solution.open_set().contains("A"));
            assert_eq!(year.solution.summary.facilities_opened, 2);
        }
    }

    #[rstest]
    fn test_failure_names_year(
        facilities: FacilityMap,
        destinations: DestinationMap,
        cost_matrix: CostMatrix,
        threshold: DistanceThreshold,
    ) {
        let transport = TransportationConfig {
            lease_years: 1,
            ..TransportationConfig::default()
        };
        let forecast = forecast(&[1000.0, 2000.0]);
        let result = solve(
            &transport,
            &forecast,
            Bounds::exact(4),
            &facilities,
            &destinations,
            &cost_matrix,
            &threshold,
        );

        let err = result.as_ref().unwrap_err();
        assert!(err.message().starts_with("Year 2025: "), "{err}");
        assert_planning_error!(result, Infeasible);
    }
}
