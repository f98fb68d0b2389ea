//! The single-year network problem.
//!
//! Decides which facilities to open and how to route each destination's demand to them for one
//! year, minimising a weighted combination of (normalised) cost and lost service. The problem is
//! a mixed-integer programme solved with HiGHS:
//!
//! * `y_f` is binary, 1 if facility `f` is open;
//! * `x_fd` is continuous in `[0, 1]`, the fraction of destination `d`'s demand served by `f`.
use crate::config::OptimizationConfig;
use crate::cost_matrix::CostMatrix;
use crate::error::{PlanningError, PlanningResult};
use crate::facility::{CapacityMap, DemandMap, DestinationID, FacilityID, FacilityMap};
use crate::service::ServiceScoring;
use crate::units::{Dimensionless, Miles, Money, MoneyPerQuantity, Quantity};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;
use serde::Serialize;

pub mod constraints;
use constraints::add_network_constraints;

/// Weight of the service term in the objective when the user gives it no weight, so that equal
/// cost solutions are separated by service
const SERVICE_TIE_BREAK: f64 = 1e-6;

/// Penalty per candidate-list position on opening a facility, so that remaining ties favour
/// earlier candidates
const POSITION_TIE_BREAK: f64 = 1e-9;

/// Absolute MIP gap, small enough for the tie-breaks to be honoured
const MIP_ABSOLUTE_GAP: f64 = POSITION_TIE_BREAK * 0.1;

/// Tolerance used when checking the extracted solution
const SOLUTION_TOLERANCE: f64 = 1e-6;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// The variables of the problem, keyed by what they represent
#[derive(Default)]
pub struct VariableMap {
    /// Whether each facility is open
    open_vars: IndexMap<FacilityID, Variable>,
    /// Fraction of each destination's demand served by each facility
    assignment_vars: IndexMap<(FacilityID, DestinationID), Variable>,
}

impl VariableMap {
    /// Iterate over the assignment variables for the given destination
    fn iter_assignments_for_destination<'a>(
        &'a self,
        destination_id: &'a DestinationID,
    ) -> impl Iterator<Item = Variable> + 'a {
        self.assignment_vars
            .iter()
            .filter(move |((_, dest_id), _)| dest_id == destination_id)
            .map(|(_, &var)| var)
    }
}

/// Lower and upper bound on the number of open facilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    /// Minimum number of open facilities
    pub min_facilities: usize,
    /// Maximum number of open facilities
    pub max_facilities: usize,
}

impl Bounds {
    /// Create new bounds, checking that `1 <= min <= max`
    pub fn new(min_facilities: usize, max_facilities: usize) -> PlanningResult<Self> {
        if min_facilities < 1 || min_facilities > max_facilities {
            return Err(PlanningError::Configuration(format!(
                "Invalid facility bounds: min {min_facilities}, max {max_facilities}"
            )));
        }

        Ok(Self {
            min_facilities,
            max_facilities,
        })
    }

    /// Bounds requiring exactly `count` facilities
    pub fn exact(count: usize) -> Self {
        Self {
            min_facilities: count,
            max_facilities: count,
        }
    }
}

/// Objective weights for cost and service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveWeights {
    /// Weight on normalised cost
    pub cost: f64,
    /// Weight on weighted service level
    pub service: f64,
}

/// Options controlling a single solve
pub struct SolveOptions<'a> {
    /// Objective weights
    pub weights: ObjectiveWeights,
    /// How service is scored from distance
    pub scoring: &'a dyn ServiceScoring,
    /// Wall-clock budget in seconds
    pub time_limit_seconds: f64,
    /// Relative optimality gap at which HiGHS may stop
    pub mip_relative_gap: f64,
    /// Whether to echo HiGHS' own output
    pub log_solver_output: bool,
}

impl<'a> SolveOptions<'a> {
    /// Options taken from the optimisation configuration
    pub fn from_config(config: &OptimizationConfig, scoring: &'a dyn ServiceScoring) -> Self {
        Self {
            weights: ObjectiveWeights {
                cost: config.cost_weight,
                service: config.service_weight,
            },
            scoring,
            time_limit_seconds: config.time_limit_seconds,
            mip_relative_gap: config.mip_relative_gap,
            log_solver_output: config.solver_log,
        }
    }
}

/// The facilities available to the solver along with their costs and capacities
#[derive(Clone, Copy)]
pub struct Network<'a> {
    /// Facilities which may be opened, in preference order
    pub facilities: &'a FacilityMap,
    /// Capacity of each facility
    pub capacity: &'a CapacityMap,
    /// Costs for every (facility, destination) pair
    pub cost_matrix: &'a CostMatrix,
}

/// Allocation of demand to a single facility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityAllocation {
    /// The facility
    pub facility: FacilityID,
    /// Whether the facility is open
    pub open: bool,
    /// Demand assigned to the facility
    pub assigned: Quantity,
    /// Capacity of the facility
    pub capacity: Quantity,
    /// Fraction of capacity used
    pub utilization: Dimensionless,
}

/// Demand from one destination routed to one facility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// The destination served
    pub destination: DestinationID,
    /// The facility serving it
    pub facility: FacilityID,
    /// Units routed along this lane
    pub units: Quantity,
    /// Length of the lane
    pub distance: Miles,
    /// Routing cost of these units
    pub cost: Money,
    /// Service score for the lane
    pub service: Dimensionless,
}

/// Headline figures of a solved year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    /// Number of open facilities
    pub facilities_opened: usize,
    /// The open facilities, in candidate order
    pub open_facilities: Vec<FacilityID>,
    /// Cost of routing demand
    pub routing_cost: Money,
    /// Fixed costs of open facilities
    pub fixed_cost: Money,
    /// Routing plus fixed cost
    pub total_cost: Money,
    /// Demand-weighted service level
    pub weighted_service_level: Dimensionless,
}

/// Key performance indicators of a solved year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionKpis {
    /// Total demand served
    pub total_demand: Quantity,
    /// Total cost divided by demand
    pub avg_cost_per_unit: MoneyPerQuantity,
    /// Demand-weighted average lane length
    pub avg_distance: Miles,
}

/// The solution for a single year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSolution {
    /// Allocation for every facility considered
    pub allocations: Vec<FacilityAllocation>,
    /// Per-destination routing detail
    pub assignments: Vec<Assignment>,
    /// Headline figures
    pub summary: OptimizationSummary,
    /// KPIs
    pub kpis: SolutionKpis,
}

impl YearSolution {
    /// The set of open facilities
    pub fn open_set(&self) -> IndexSet<FacilityID> {
        self.summary.open_facilities.iter().cloned().collect()
    }
}

/// How the open facilities are chosen
enum Selection<'a> {
    /// Solver chooses, within bounds
    Bounded(Bounds),
    /// Open set fixed in advance
    Pinned(&'a IndexSet<FacilityID>),
}

/// Solve the single-year problem, letting the solver choose the open facilities within bounds.
///
/// # Arguments
///
/// * `network` - Facilities, capacities and costs
/// * `demand` - Demand per destination
/// * `bounds` - Bounds on the number of open facilities
/// * `options` - Options for the solve
///
/// # Returns
///
/// The solution, [`PlanningError::Infeasible`] if the bounds can't be met or
/// [`PlanningError::NoSolution`] if HiGHS stops without an optimal solution.
pub fn solve_year(
    network: Network,
    demand: &DemandMap,
    bounds: Bounds,
    options: &SolveOptions,
) -> PlanningResult<YearSolution> {
    check_bounds_feasible(network, demand, bounds)?;
    solve(network, demand, &Selection::Bounded(bounds), options)
}

/// Solve the single-year problem with the given set of facilities open
pub fn solve_year_with_open_set(
    network: Network,
    demand: &DemandMap,
    open: &IndexSet<FacilityID>,
    options: &SolveOptions,
) -> PlanningResult<YearSolution> {
    check_open_set_feasible(network, demand, open)?;
    solve(network, demand, &Selection::Pinned(open), options)
}

/// Check that the bounds could be met with the facilities and capacity available
fn check_bounds_feasible(
    network: Network,
    demand: &DemandMap,
    bounds: Bounds,
) -> PlanningResult<()> {
    let available = network.facilities.len();
    if bounds.min_facilities > available {
        return Err(PlanningError::Infeasible(format!(
            "At least {} facilities required but only {available} available",
            bounds.min_facilities
        )));
    }

    let (mandatory, optional): (Vec<_>, Vec<_>) = network
        .facilities
        .values()
        .partition(|facility| facility.mandatory);
    if mandatory.len() > bounds.max_facilities {
        return Err(PlanningError::Infeasible(format!(
            "{} mandatory facilities but at most {} may be open",
            mandatory.len(),
            bounds.max_facilities
        )));
    }

    // The best we can do is the mandatory facilities plus the largest of the rest
    let mandatory_capacity = mandatory
        .iter()
        .map(|facility| capacity_of(network.capacity, &facility.id))
        .sum::<PlanningResult<Quantity>>()?;
    let optional_capacity = optional
        .iter()
        .map(|facility| capacity_of(network.capacity, &facility.id))
        .collect::<PlanningResult<Vec<_>>>()?
        .into_iter()
        .sorted_by(|a, b| b.value().total_cmp(&a.value()))
        .take(bounds.max_facilities - mandatory.len())
        .sum::<Quantity>();
    let max_capacity = mandatory_capacity + optional_capacity;
    let total_demand: Quantity = demand.values().sum();
    if max_capacity.value() < total_demand.value() * (1.0 - SOLUTION_TOLERANCE) {
        return Err(PlanningError::Infeasible(format!(
            "Demand of {total_demand} exceeds the largest capacity achievable with at most {} \
            facilities ({max_capacity})",
            bounds.max_facilities
        )));
    }

    Ok(())
}

/// Check that a pinned open set can serve the demand
fn check_open_set_feasible(
    network: Network,
    demand: &DemandMap,
    open: &IndexSet<FacilityID>,
) -> PlanningResult<()> {
    if open.is_empty() {
        return Err(PlanningError::Infeasible(
            "No facilities in the open set".into(),
        ));
    }
    for facility_id in open {
        if !network.facilities.contains_key(facility_id) {
            return Err(PlanningError::Infeasible(format!(
                "Facility {facility_id} is not available"
            )));
        }
    }
    if let Some(facility) = network
        .facilities
        .values()
        .find(|facility| facility.mandatory && !open.contains(&facility.id))
    {
        return Err(PlanningError::Infeasible(format!(
            "Mandatory facility {} is not in the open set",
            facility.id
        )));
    }

    let open_capacity = open
        .iter()
        .map(|id| capacity_of(network.capacity, id))
        .sum::<PlanningResult<Quantity>>()?;
    let total_demand: Quantity = demand.values().sum();
    if open_capacity.value() < total_demand.value() * (1.0 - SOLUTION_TOLERANCE) {
        return Err(PlanningError::Infeasible(format!(
            "Demand of {total_demand} exceeds the capacity of the open facilities \
            ({open_capacity})"
        )));
    }

    Ok(())
}

/// Look up a facility's capacity
fn capacity_of(capacity: &CapacityMap, facility_id: &FacilityID) -> PlanningResult<Quantity> {
    capacity.get(facility_id).copied().ok_or_else(|| {
        PlanningError::Infeasible(format!("No capacity given for facility {facility_id}"))
    })
}

/// Build, solve and extract the problem
fn solve(
    network: Network,
    demand: &DemandMap,
    selection: &Selection,
    options: &SolveOptions,
) -> PlanningResult<YearSolution> {
    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, network, demand, selection, options)?;

    let facility_count = match selection {
        Selection::Bounded(bounds) => Some((bounds.min_facilities, bounds.max_facilities)),
        Selection::Pinned(_) => None,
    };
    add_network_constraints(
        &mut problem,
        &variables,
        demand,
        network.capacity,
        facility_count,
    );

    let mut model = problem.optimise(Sense::Minimise);
    model.set_option("output_flag", options.log_solver_output);
    model.set_option("time_limit", options.time_limit_seconds);
    model.set_option("mip_rel_gap", options.mip_relative_gap);
    model.set_option("mip_abs_gap", MIP_ABSOLUTE_GAP);

    let solved = model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let solution = solved.get_solution();
            extract_solution(network, demand, &variables, &solution, options)
        }
        HighsModelStatus::Infeasible => Err(PlanningError::Infeasible(
            "The solver proved the problem infeasible".into(),
        )),
        status => Err(PlanningError::NoSolution(format!(
            "The solver stopped with status {status:?}"
        ))),
    }
}

/// Add variables to the problem, along with their objective coefficients.
///
/// Mandatory (and, for a pinned selection, all) facilities have their open variable fixed.
fn add_variables(
    problem: &mut Problem,
    network: Network,
    demand: &DemandMap,
    selection: &Selection,
    options: &SolveOptions,
) -> PlanningResult<VariableMap> {
    let total_demand = demand.values().sum::<Quantity>().value().max(f64::MIN_POSITIVE);
    let cost_scale = cost_scale(network, demand)?;
    let weights = options.weights;
    let service_weight = if weights.service > 0.0 {
        weights.service
    } else {
        SERVICE_TIE_BREAK
    };

    let mut variables = VariableMap::default();
    for (position, facility) in network.facilities.values().enumerate() {
        let fixed_cost = network.cost_matrix.fixed_cost(&facility.id)?;
        let coeff = weights.cost * fixed_cost.value() / cost_scale
            + POSITION_TIE_BREAK * (position + 1) as f64;
        let bounds = match selection {
            Selection::Pinned(open) if open.contains(&facility.id) => 1.0..=1.0,
            Selection::Pinned(_) => 0.0..=0.0,
            Selection::Bounded(_) if facility.mandatory => 1.0..=1.0,
            Selection::Bounded(_) => 0.0..=1.0,
        };
        let var = problem.add_integer_column(coeff, bounds);
        variables.open_vars.insert(facility.id.clone(), var);
    }

    for facility_id in network.facilities.keys() {
        for (dest_id, &units) in demand {
            let entry = network.cost_matrix.get(facility_id, dest_id)?;
            let score = options.scoring.score(entry.distance);
            let coeff = weights.cost * (entry.cost_per_unit * units).value() / cost_scale
                - service_weight * units.value() * score.value() / total_demand;
            let var = problem.add_column(coeff, 0.0..=1.0);
            variables
                .assignment_vars
                .insert((facility_id.clone(), dest_id.clone()), var);
        }
    }

    Ok(variables)
}

/// The cost of the most expensive conceivable network, used to normalise the cost term
fn cost_scale(network: Network, demand: &DemandMap) -> PlanningResult<f64> {
    let mut scale = 0.0;
    for (dest_id, &units) in demand {
        let mut worst = MoneyPerQuantity(0.0);
        for facility_id in network.facilities.keys() {
            worst = worst.max(network.cost_matrix.get(facility_id, dest_id)?.cost_per_unit);
        }
        scale += (worst * units).value();
    }
    for facility_id in network.facilities.keys() {
        scale += network.cost_matrix.fixed_cost(facility_id)?.value();
    }

    Ok(if scale > 0.0 { scale } else { 1.0 })
}

/// Read the solution back out of HiGHS and check it
fn extract_solution(
    network: Network,
    demand: &DemandMap,
    variables: &VariableMap,
    solution: &highs::Solution,
    options: &SolveOptions,
) -> PlanningResult<YearSolution> {
    let open_facilities = variables
        .open_vars
        .iter()
        .filter(|&(_, &var)| solution[var] > 0.5)
        .map(|(id, _)| id.clone())
        .collect_vec();

    let total_demand: Quantity = demand.values().sum();
    let mut assignments = Vec::new();
    let mut assigned: IndexMap<&FacilityID, Quantity> = IndexMap::new();
    let mut served: IndexMap<&DestinationID, f64> = IndexMap::new();
    for ((facility_id, dest_id), &var) in &variables.assignment_vars {
        let fraction = solution[var].clamp(0.0, 1.0);
        *served.entry(dest_id).or_default() += fraction;
        if fraction <= SOLUTION_TOLERANCE {
            continue;
        }

        let entry = network.cost_matrix.get(facility_id, dest_id)?;
        let units = demand[dest_id] * Dimensionless(fraction);
        *assigned.entry(facility_id).or_default() += units;
        assignments.push(Assignment {
            destination: dest_id.clone(),
            facility: facility_id.clone(),
            units,
            distance: entry.distance,
            cost: entry.cost_per_unit * units,
            service: options.scoring.score(entry.distance),
        });
    }

    // Every destination fully served
    for (dest_id, fraction) in &served {
        if (fraction - 1.0).abs() > SOLUTION_TOLERANCE {
            return Err(PlanningError::NoSolution(format!(
                "Demand for {dest_id} not conserved in solution ({fraction} served)"
            )));
        }
    }

    let mut allocations = Vec::new();
    for facility_id in network.facilities.keys() {
        let capacity = capacity_of(network.capacity, facility_id)?;
        let load = assigned.get(facility_id).copied().unwrap_or_default();
        if load.value() > capacity.value() * (1.0 + SOLUTION_TOLERANCE) + SOLUTION_TOLERANCE {
            return Err(PlanningError::NoSolution(format!(
                "Facility {facility_id} allocated {load} which exceeds its capacity {capacity}"
            )));
        }
        let utilization = if capacity > Quantity(0.0) {
            load / capacity
        } else {
            Dimensionless(0.0)
        };
        allocations.push(FacilityAllocation {
            facility: facility_id.clone(),
            open: open_facilities.contains(facility_id),
            assigned: load,
            capacity,
            utilization,
        });
    }

    let routing_cost: Money = assignments.iter().map(|a| a.cost).sum();
    let fixed_cost = open_facilities
        .iter()
        .map(|id| network.cost_matrix.fixed_cost(id))
        .sum::<PlanningResult<Money>>()?;
    let total_cost = routing_cost + fixed_cost;
    let weighted_service_level = Dimensionless(
        assignments
            .iter()
            .map(|a| a.units.value() * a.service.value())
            .sum::<f64>()
            / total_demand.value(),
    );
    let avg_distance = Miles(
        assignments
            .iter()
            .map(|a| a.units.value() * a.distance.value())
            .sum::<f64>()
            / total_demand.value(),
    );

    debug!(
        "Solved network with {} open facilities ({}), total cost {total_cost}, service \
        {weighted_service_level}",
        open_facilities.len(),
        open_facilities.iter().join("; ")
    );

    Ok(YearSolution {
        allocations,
        assignments,
        summary: OptimizationSummary {
            facilities_opened: open_facilities.len(),
            open_facilities,
            routing_cost,
            fixed_cost,
            total_cost,
            weighted_service_level,
        },
        kpis: SolutionKpis {
            total_demand,
            avg_cost_per_unit: total_cost / total_demand,
            avg_distance,
        },
    })
}
