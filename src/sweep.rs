//! Sweeping over a range of network sizes and choosing the best.
//!
//! Each network size is an independent scenario. A scenario which can't be solved is recorded with
//! its error and sentinel KPIs rather than aborting the sweep; only problems with the request
//! itself (invalid configuration, unresolvable locations) fail the whole sweep.
use crate::baseline::{BaselineProvider, DefaultBaselineProvider, resolve_baseline};
use crate::cost_matrix::{BaselineReference, CostMatrix};
use crate::error::{ErrorKind, PlanningError, PlanningResult};
use crate::estimate::{
    CarryingCostInventoryEstimator, FlatRateWarehouseEstimator, InventoryEstimate,
    InventoryEstimator, WarehouseEstimate, WarehouseEstimator,
};
use crate::facility::{FacilityID, build_capacity_map, select_scenario_facilities};
use crate::horizon::{HorizonContext, NetworkPlan, solve_horizon};
use crate::location::{DistanceSource, LocationCatalog};
use crate::request::{Criterion, PlanningInput, SweepRequest};
use crate::solver::{Bounds, Network, SolveOptions};
use crate::units::{Dimensionless, Money, MoneyPerQuantity};
use float_cmp::{ApproxEq, F64Margin};
use indexmap::IndexSet;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use std::cmp::Ordering;

/// Relative tolerance when comparing scenario costs and service levels
const RELATIVE_TOLERANCE: f64 = 1e-9;

/// The external services the sweep depends on
pub struct Collaborators<'a> {
    /// Supplies the historical baseline
    pub baseline: &'a dyn BaselineProvider,
    /// Estimates warehouse costs
    pub warehouse: &'a dyn WarehouseEstimator,
    /// Estimates inventory costs
    pub inventory: &'a dyn InventoryEstimator,
    /// Supplies distances. If `None`, the built-in location catalogue is used.
    pub distances: Option<&'a dyn DistanceSource>,
}

impl Default for Collaborators<'_> {
    fn default() -> Self {
        Self {
            baseline: &DefaultBaselineProvider,
            warehouse: &FlatRateWarehouseEstimator,
            inventory: &CarryingCostInventoryEstimator,
            distances: None,
        }
    }
}

/// Key performance indicators for a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioKpis {
    /// Transportation (including switching), warehouse and inventory cost over the horizon
    pub total_cost: Money,
    /// Transportation cost over the horizon, including switching
    pub transportation_cost: Money,
    /// Warehouse cost over the horizon
    pub warehouse_cost: Money,
    /// Inventory cost over the horizon
    pub inventory_cost: Money,
    /// Demand-weighted service level over the horizon
    pub weighted_service_level: Dimensionless,
    /// Whether the service level meets the configured requirement
    pub meets_service_requirement: bool,
    /// Facilities open in the first year
    pub facilities_opened: usize,
    /// Total cost per unit moved
    pub avg_cost_per_unit: MoneyPerQuantity,
    /// Baseline transportation spend scaled to the horizon's volume
    pub baseline_scaled: Money,
    /// Scaled baseline minus transportation cost
    pub savings: Money,
    /// Savings as a percentage of the scaled baseline
    pub savings_percent: f64,
}

impl ScenarioKpis {
    /// The KPIs recorded for a failed scenario
    fn sentinel(baseline_scaled: Money) -> Self {
        Self {
            total_cost: Money(f64::INFINITY),
            transportation_cost: Money(f64::INFINITY),
            warehouse_cost: Money(0.0),
            inventory_cost: Money(0.0),
            weighted_service_level: Dimensionless(0.0),
            meets_service_requirement: false,
            facilities_opened: 0,
            avg_cost_per_unit: MoneyPerQuantity(f64::INFINITY),
            baseline_scaled,
            savings: Money(f64::NEG_INFINITY),
            savings_percent: f64::NEG_INFINITY,
        }
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioError {
    /// The kind of error
    pub kind: ErrorKind,
    /// Description of the error
    pub message: String,
}

impl From<&PlanningError> for ScenarioError {
    fn from(err: &PlanningError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// The result of a scenario, successful or not
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScenarioOutcome {
    /// The network was solved for every year
    Solved {
        /// The multi-year plan
        plan: NetworkPlan,
        /// Warehouse cost over the horizon
        warehouse: Money,
        /// Inventory cost over the horizon
        inventory: Money,
        /// Facilities open in any year, in candidate order
        facilities_used: Vec<FacilityID>,
    },
    /// The scenario couldn't be solved
    Failed {
        /// What went wrong
        error: ScenarioError,
    },
}

/// A single network size evaluated by the sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    /// Number of facilities in the network
    pub nodes: usize,
    /// Plan or error
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
    /// KPIs (sentinel values if the scenario failed)
    pub kpis: ScenarioKpis,
}

impl Scenario {
    /// A failed scenario
    fn failed(nodes: usize, err: &PlanningError, baseline_scaled: Money) -> Self {
        Self {
            nodes,
            outcome: ScenarioOutcome::Failed { error: err.into() },
            kpis: ScenarioKpis::sentinel(baseline_scaled),
        }
    }

    /// Whether the scenario was solved
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScenarioOutcome::Solved { .. })
    }

    /// The plan, if the scenario was solved
    pub fn plan(&self) -> Option<&NetworkPlan> {
        match &self.outcome {
            ScenarioOutcome::Solved { plan, .. } => Some(plan),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    /// The error, if the scenario failed
    pub fn error(&self) -> Option<&ScenarioError> {
        match &self.outcome {
            ScenarioOutcome::Solved { .. } => None,
            ScenarioOutcome::Failed { error } => Some(error),
        }
    }

    /// Facilities used by the scenario (empty if it failed)
    pub fn facilities_used(&self) -> &[FacilityID] {
        match &self.outcome {
            ScenarioOutcome::Solved {
                facilities_used, ..
            } => facilities_used,
            ScenarioOutcome::Failed { .. } => &[],
        }
    }
}

/// Range of total costs across successful scenarios
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostRange {
    /// Lowest total cost
    pub min: Money,
    /// Highest total cost
    pub max: Money,
}

/// Overview of a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of scenarios evaluated
    pub scenarios_run: usize,
    /// Number solved
    pub successful_scenarios: usize,
    /// Number which failed
    pub failed_scenarios: usize,
    /// Network size of the best scenario
    pub best_scenario_nodes: Option<usize>,
    /// Total cost of the best scenario
    pub best_scenario_cost: Option<Money>,
    /// Range of total costs across successful scenarios
    pub cost_range: Option<CostRange>,
}

/// Comparison of the best scenario with the historical baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineIntegration {
    /// Annual historical transportation spend
    pub historical_baseline: Money,
    /// Baseline scaled to the horizon's volume
    pub baseline_scaled: Money,
    /// Number of years in the horizon
    pub horizon_years: usize,
    /// Transportation cost of the best scenario
    pub best_cost: Option<Money>,
    /// Scaled baseline minus best transportation cost
    pub savings: Option<Money>,
    /// Savings as a percentage of the scaled baseline
    pub savings_percent: Option<f64>,
    /// Whether the default baseline was used because the lookup failed
    pub fallback_used: bool,
}

/// The result of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// Every scenario, in sweep order
    pub scenarios: Vec<Scenario>,
    /// Index of the best scenario, if any succeeded
    pub best_index: Option<usize>,
    /// Overview of the sweep
    pub batch_summary: BatchSummary,
    /// Warehouse estimate shared by every scenario
    pub warehouse: Option<WarehouseEstimate>,
    /// Inventory estimate shared by every scenario
    pub inventory: Option<InventoryEstimate>,
    /// Comparison with the baseline
    pub baseline_integration: BaselineIntegration,
}

impl SweepOutcome {
    /// The best scenario, if any succeeded
    pub fn best(&self) -> Option<&Scenario> {
        self.best_index.map(|idx| &self.scenarios[idx])
    }
}

/// Everything shared by the scenarios of a sweep
struct SweepContext<'a> {
    input: &'a PlanningInput,
    cost_matrix: &'a CostMatrix,
    options: &'a SolveOptions<'a>,
    estimates: &'a PlanningResult<(WarehouseEstimate, InventoryEstimate)>,
    baseline_scaled: Money,
}

/// Validate a request and run the sweep
pub fn sweep(request: SweepRequest, collaborators: &Collaborators) -> PlanningResult<SweepOutcome> {
    let input = request.validate()?;
    run_sweep(&input, collaborators)
}

/// Run the sweep over a validated request.
///
/// # Returns
///
/// The outcome of every scenario, or an error if the request can't be planned at all.
pub fn run_sweep(
    input: &PlanningInput,
    collaborators: &Collaborators,
) -> PlanningResult<SweepOutcome> {
    let baseline = resolve_baseline(collaborators.baseline);
    let baseline_units = input.forecast.first().annual_units;
    let reference = BaselineReference {
        annual_cost: baseline.annual_cost,
        annual_units: baseline_units,
    };
    let baseline_scaled =
        baseline.annual_cost * (input.forecast.total_units() / baseline_units);

    // Built once and shared by every scenario
    let catalog;
    let distances: &dyn DistanceSource = match collaborators.distances {
        Some(distances) => distances,
        None => {
            catalog = LocationCatalog::with_locations(input.locations.clone());
            &catalog
        }
    };
    let cost_matrix = CostMatrix::build(
        &input.facilities,
        &input.destinations,
        &reference,
        &input.config.transportation,
        distances,
    )?;

    let estimates = estimate_costs(input, collaborators);
    if let Err(err) = &estimates {
        warn!("{err}; every scenario will fail");
    }

    let transport = &input.config.transportation;
    let scoring = input
        .config
        .optimization
        .service_scoring
        .scoring(transport.max_distance_miles);
    let options = SolveOptions::from_config(&input.config.optimization, scoring.as_ref());
    let context = SweepContext {
        input,
        cost_matrix: &cost_matrix,
        options: &options,
        estimates: &estimates,
        baseline_scaled,
    };

    let mut scenarios = Vec::with_capacity(input.node_counts.len());
    for &nodes in &input.node_counts {
        info!("Running scenario with {nodes} facilities");
        match run_scenario(nodes, &context) {
            Ok(scenario) => {
                info!(
                    "Scenario with {nodes} facilities: total cost {}, service {}",
                    scenario.kpis.total_cost, scenario.kpis.weighted_service_level
                );
                scenarios.push(scenario);
            }
            Err(err) => {
                warn!("Scenario with {nodes} facilities failed: {err}");
                scenarios.push(Scenario::failed(nodes, &err, baseline_scaled));
            }
        }
    }

    let best_index = select_best(&scenarios, input.criterion);
    let batch_summary = summarise(&scenarios, best_index);
    let baseline_integration = BaselineIntegration::new(
        baseline.annual_cost,
        baseline_scaled,
        input.forecast.len(),
        best_index.map(|idx| &scenarios[idx]),
        baseline.fallback_used,
    );
    let (warehouse, inventory) = estimates.ok().unzip();

    Ok(SweepOutcome {
        scenarios,
        best_index,
        batch_summary,
        warehouse,
        inventory,
        baseline_integration,
    })
}

/// Call the warehouse and inventory estimators
fn estimate_costs(
    input: &PlanningInput,
    collaborators: &Collaborators,
) -> PlanningResult<(WarehouseEstimate, InventoryEstimate)> {
    let upstream = |what: &str, err: PlanningError| match err {
        PlanningError::UpstreamUnavailable(_) => err,
        err => PlanningError::UpstreamUnavailable(format!("{what} estimate failed: {err}")),
    };
    let config = &input.config.warehouse;
    let warehouse = collaborators
        .warehouse
        .estimate(&input.forecast, &input.skus, config)
        .map_err(|err| upstream("Warehouse", err))?;
    let inventory = collaborators
        .inventory
        .estimate(&input.forecast, &input.skus, config)
        .map_err(|err| upstream("Inventory", err))?;

    Ok((warehouse, inventory))
}

/// Solve the horizon for a single network size
fn run_scenario(nodes: usize, context: &SweepContext) -> PlanningResult<Scenario> {
    let (warehouse, inventory) = context.estimates.as_ref().map_err(Clone::clone)?;
    let input = context.input;
    let optimization = &input.config.optimization;
    let transport = &input.config.transportation;

    let facilities =
        select_scenario_facilities(&input.facilities, nodes, optimization.candidate_headroom);
    let capacity = build_capacity_map(
        &facilities,
        input.forecast.peak().annual_units,
        optimization.capacity_fraction,
    );
    let horizon = HorizonContext {
        network: Network {
            facilities: &facilities,
            capacity: &capacity,
            cost_matrix: context.cost_matrix,
        },
        destinations: &input.destinations,
        bounds: Bounds::new(nodes, nodes)?,
        options: context.options,
    };
    let plan = solve_horizon(transport, &input.forecast, &horizon)?;

    let transportation_cost = plan.total_cost();
    let total_cost = transportation_cost + warehouse.total_cost + inventory.total_cost;
    let savings = context.baseline_scaled - transportation_cost;
    let kpis = ScenarioKpis {
        total_cost,
        transportation_cost,
        warehouse_cost: warehouse.total_cost,
        inventory_cost: inventory.total_cost,
        weighted_service_level: plan.totals.weighted_service_level,
        meets_service_requirement: plan.totals.weighted_service_level
            >= transport.service_level_requirement,
        facilities_opened: plan.totals.facilities_opened_year1,
        avg_cost_per_unit: total_cost / plan.totals.total_units,
        baseline_scaled: context.baseline_scaled,
        savings,
        savings_percent: percent_of(savings, context.baseline_scaled),
    };

    // Facilities open in any year, in candidate order
    let used: IndexSet<&FacilityID> = plan
        .years
        .iter()
        .flat_map(|year| &year.solution.summary.open_facilities)
        .collect();
    let facilities_used = facilities
        .keys()
        .filter(|id| used.contains(id))
        .cloned()
        .collect();

    Ok(Scenario {
        nodes,
        outcome: ScenarioOutcome::Solved {
            plan,
            warehouse: warehouse.total_cost,
            inventory: inventory.total_cost,
            facilities_used,
        },
        kpis,
    })
}

/// `value` as a percentage of `whole`
fn percent_of(value: Money, whole: Money) -> f64 {
    if whole > Money(0.0) {
        (value / whole).value() * 100.0
    } else {
        0.0
    }
}

/// Whether two values are equal within the relative tolerance
fn nearly_equal(a: f64, b: f64) -> bool {
    a.approx_eq(
        b,
        F64Margin {
            epsilon: RELATIVE_TOLERANCE * a.abs().max(b.abs()),
            ulps: 4,
        },
    )
}

/// Compare two values, treating nearly equal values as equal
fn compare(a: f64, b: f64) -> Ordering {
    if nearly_equal(a, b) {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Rank `a` against `b` under the criterion. `Less` means `a` is better.
fn rank(a: &ScenarioKpis, b: &ScenarioKpis, criterion: Criterion) -> Ordering {
    let cost = compare(a.total_cost.value(), b.total_cost.value());
    // Higher service is better
    let service = compare(
        b.weighted_service_level.value(),
        a.weighted_service_level.value(),
    );

    match criterion {
        Criterion::TotalCost => cost.then(service),
        Criterion::ServiceThenCost => service.then(cost),
    }
}

/// Pick the best of the given KPIs, keeping the earliest on ties
fn best_of<'a, I>(candidates: I, criterion: Criterion) -> Option<usize>
where
    I: IntoIterator<Item = (usize, &'a ScenarioKpis)>,
{
    candidates
        .into_iter()
        .reduce(|best, candidate| {
            if rank(candidate.1, best.1, criterion) == Ordering::Less {
                candidate
            } else {
                best
            }
        })
        .map(|(idx, _)| idx)
}

/// Index of the best successful scenario
pub fn select_best(scenarios: &[Scenario], criterion: Criterion) -> Option<usize> {
    best_of(
        scenarios
            .iter()
            .enumerate()
            .filter(|(_, scenario)| scenario.is_success())
            .map(|(idx, scenario)| (idx, &scenario.kpis)),
        criterion,
    )
}

/// Summarise a sweep's scenarios
fn summarise(scenarios: &[Scenario], best_index: Option<usize>) -> BatchSummary {
    let successful = scenarios.iter().filter(|s| s.is_success()).collect_vec();
    let cost_range = successful
        .iter()
        .map(|s| s.kpis.total_cost)
        .fold(None, |range: Option<CostRange>, cost| {
            Some(match range {
                Some(range) => CostRange {
                    min: range.min.min(cost),
                    max: range.max.max(cost),
                },
                None => CostRange {
                    min: cost,
                    max: cost,
                },
            })
        });
    let best = best_index.map(|idx| &scenarios[idx]);

    BatchSummary {
        scenarios_run: scenarios.len(),
        successful_scenarios: successful.len(),
        failed_scenarios: scenarios.len() - successful.len(),
        best_scenario_nodes: best.map(|s| s.nodes),
        best_scenario_cost: best.map(|s| s.kpis.total_cost),
        cost_range,
    }
}

impl BaselineIntegration {
    fn new(
        historical_baseline: Money,
        baseline_scaled: Money,
        horizon_years: usize,
        best: Option<&Scenario>,
        fallback_used: bool,
    ) -> Self {
        let best_cost = best.map(|s| s.kpis.transportation_cost);
        let savings = best_cost.map(|cost| baseline_scaled - cost);

        Self {
            historical_baseline,
            baseline_scaled,
            horizon_years,
            best_cost,
            savings,
            savings_percent: savings.map(|savings| percent_of(savings, baseline_scaled)),
            fallback_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{DEFAULT_BASELINE_COST, FixedBaselineProvider};
    use crate::config::WarehouseConfig;
    use crate::fixture::{FailingBaselineProvider, distance_table, sweep_request};
    use crate::forecast::Forecast;
    use crate::location::DistanceTable;
    use crate::request::Sku;
    use crate::units::Quantity;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    struct FailingWarehouseEstimator;

    impl WarehouseEstimator for FailingWarehouseEstimator {
        fn estimate(
            &self,
            _forecast: &Forecast,
            _skus: &[Sku],
            _config: &WarehouseConfig,
        ) -> PlanningResult<WarehouseEstimate> {
            Err(PlanningError::UpstreamUnavailable(
                "warehouse service down".into(),
            ))
        }
    }

    fn collaborators<'a>(
        baseline: &'a dyn BaselineProvider,
        distances: &'a DistanceTable,
    ) -> Collaborators<'a> {
        Collaborators {
            baseline,
            distances: Some(distances),
            ..Collaborators::default()
        }
    }

    #[rstest]
    fn test_single_scenario(mut sweep_request: SweepRequest, distance_table: DistanceTable) {
        sweep_request.scenario.max_nodes = Some(1);
        let baseline = FixedBaselineProvider(Money(100_000.0));
        let outcome = sweep(sweep_request, &collaborators(&baseline, &distance_table)).unwrap();

        assert_eq!(outcome.scenarios.len(), 1);
        let scenario = &outcome.scenarios[0];
        assert!(scenario.is_success());
        assert_eq!(scenario.facilities_used(), [FacilityID::from("A")]);

        let year = &scenario.plan().unwrap().years[0];
        let allocated: Quantity = year.solution.allocations.iter().map(|a| a.assigned).sum();
        assert_approx_eq!(Quantity, allocated, Quantity(1000.0), epsilon = 1e-6);

        assert_eq!(outcome.best_index, Some(0));
        assert!(!outcome.baseline_integration.fallback_used);
        assert_eq!(
            outcome.baseline_integration.historical_baseline,
            Money(100_000.0)
        );
    }

    #[rstest]
    fn test_sweep_node_range(mut sweep_request: SweepRequest, distance_table: DistanceTable) {
        sweep_request.scenario.max_nodes = Some(3);
        let baseline = FixedBaselineProvider(Money(100_000.0));
        let outcome = sweep(sweep_request, &collaborators(&baseline, &distance_table)).unwrap();

        assert!(outcome.scenarios.iter().map(|s| s.nodes).eq([1, 2, 3]));
        assert_eq!(outcome.batch_summary.scenarios_run, 3);
        assert_eq!(outcome.batch_summary.failed_scenarios, 0);

        // Once a scenario succeeds, bigger networks do too
        let first_success = outcome.scenarios.iter().position(Scenario::is_success);
        assert!(
            outcome.scenarios[first_success.unwrap()..]
                .iter()
                .all(Scenario::is_success)
        );

        for scenario in &outcome.scenarios {
            let plan = scenario.plan().unwrap();
            assert_eq!(plan.totals.facilities_opened_year1, scenario.nodes);
            for year in &plan.years {
                assert!(year.solution.open_set().contains("A"));
            }
        }

        // With fixed costs dominating, the smallest network is cheapest
        assert_eq!(outcome.batch_summary.best_scenario_nodes, Some(1));
        let range = outcome.batch_summary.cost_range.unwrap();
        assert!(range.min <= range.max);
        assert_eq!(Some(range.min), outcome.batch_summary.best_scenario_cost);
    }

    #[rstest]
    fn test_facilities_used_in_candidate_order(
        mut sweep_request: SweepRequest,
        distance_table: DistanceTable,
    ) {
        // The mandatory facility is the last candidate
        sweep_request.scenario.max_nodes = Some(2);
        sweep_request.config.transportation.mandatory_facilities = vec!["C".into()];
        let outcome = sweep(
            sweep_request,
            &collaborators(&DefaultBaselineProvider, &distance_table),
        )
        .unwrap();

        let scenario = &outcome.scenarios[1];
        assert_eq!(scenario.nodes, 2);
        let used = scenario.facilities_used();
        assert_eq!(used.len(), 2);
        assert_eq!(used.last(), Some(&FacilityID::from("C")));
    }

    #[rstest]
    fn test_baseline_fallback(sweep_request: SweepRequest, distance_table: DistanceTable) {
        let outcome = sweep(
            sweep_request,
            &collaborators(&FailingBaselineProvider, &distance_table),
        )
        .unwrap();

        let integration = &outcome.baseline_integration;
        assert!(integration.fallback_used);
        assert_eq!(integration.historical_baseline, DEFAULT_BASELINE_COST);
        assert_eq!(integration.horizon_years, 1);
        assert!(outcome.best().is_some());
    }

    #[rstest]
    fn test_estimator_failure_fails_every_scenario(
        mut sweep_request: SweepRequest,
        distance_table: DistanceTable,
    ) {
        sweep_request.scenario.max_nodes = Some(2);
        let collaborators = Collaborators {
            warehouse: &FailingWarehouseEstimator,
            ..collaborators(&DefaultBaselineProvider, &distance_table)
        };
        let outcome = sweep(sweep_request, &collaborators).unwrap();

        assert_eq!(outcome.scenarios.len(), 2);
        for scenario in &outcome.scenarios {
            assert_eq!(
                scenario.error().unwrap().kind,
                ErrorKind::UpstreamUnavailable
            );
            assert_eq!(scenario.kpis.total_cost, Money(f64::INFINITY));
            assert_eq!(scenario.kpis.weighted_service_level, Dimensionless(0.0));
        }
        assert!(outcome.best().is_none());
        assert_eq!(outcome.batch_summary.cost_range, None);
        assert_eq!(outcome.warehouse, None);
    }

    #[rstest]
    fn test_infeasible_scenario_recorded(
        mut sweep_request: SweepRequest,
        distance_table: DistanceTable,
    ) {
        // Only three candidates, so four nodes can't be opened
        sweep_request.scenario.min_nodes = 2;
        sweep_request.scenario.max_nodes = Some(4);
        let outcome = sweep(
            sweep_request,
            &collaborators(&DefaultBaselineProvider, &distance_table),
        )
        .unwrap();

        assert_eq!(outcome.scenarios.len(), 3);
        assert!(outcome.scenarios[0].is_success());
        assert!(outcome.scenarios[1].is_success());
        let failed = &outcome.scenarios[2];
        assert_eq!(failed.nodes, 4);
        assert_eq!(failed.error().unwrap().kind, ErrorKind::Infeasible);
        assert!(failed.facilities_used().is_empty());
        assert_eq!(outcome.batch_summary.successful_scenarios, 2);
        assert_eq!(outcome.batch_summary.failed_scenarios, 1);
        assert_eq!(outcome.batch_summary.best_scenario_nodes, Some(2));
    }

    #[rstest]
    fn test_unresolved_location_fails_sweep(sweep_request: SweepRequest) {
        let result = sweep(sweep_request, &Collaborators::default());
        assert!(matches!(result, Err(PlanningError::UnresolvedLocation(_))));
    }

    fn kpis(total_cost: f64, service: f64) -> ScenarioKpis {
        ScenarioKpis {
            total_cost: Money(total_cost),
            weighted_service_level: Dimensionless(service),
            ..ScenarioKpis::sentinel(Money(0.0))
        }
    }

    #[rstest]
    #[case(Criterion::TotalCost, &[(100.0, 0.5), (90.0, 0.4), (95.0, 1.0)], Some(1))]
    #[case(Criterion::TotalCost, &[(100.0, 0.5), (100.0, 0.9), (100.0, 0.9)], Some(1))]
    #[case(Criterion::TotalCost, &[(100.0, 0.5), (100.0 + 1e-12, 0.9)], Some(1))]
    #[case(Criterion::ServiceThenCost, &[(100.0, 0.5), (90.0, 0.4), (95.0, 1.0)], Some(2))]
    #[case(Criterion::ServiceThenCost, &[(100.0, 1.0), (90.0, 1.0), (90.0, 1.0)], Some(1))]
    #[case(Criterion::TotalCost, &[], None)]
    fn test_best_of(
        #[case] criterion: Criterion,
        #[case] values: &[(f64, f64)],
        #[case] expected: Option<usize>,
    ) {
        let kpis = values
            .iter()
            .map(|&(cost, service)| kpis(cost, service))
            .collect_vec();
        assert_eq!(best_of(kpis.iter().enumerate(), criterion), expected);
    }
}
