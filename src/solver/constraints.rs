//! Code for adding constraints to the single-year network problem.
use super::VariableMap;
use crate::facility::{CapacityMap, DemandMap};
use highs::RowProblem as Problem;

/// Add all constraints to the problem.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `demand` - Demand per destination for the year
/// * `capacity` - Capacity per facility
/// * `facility_count` - Optional (min, max) bounds on the number of open facilities
pub fn add_network_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    demand: &DemandMap,
    capacity: &CapacityMap,
    facility_count: Option<(usize, usize)>,
) {
    add_demand_constraints(problem, variables, demand);
    add_linking_constraints(problem, variables);
    add_capacity_constraints(problem, variables, demand, capacity);
    if let Some((min, max)) = facility_count {
        add_facility_count_constraint(problem, variables, min, max);
    }
}

/// Every destination's demand must be fully served: `Σ_f x_fd = 1`
fn add_demand_constraints(problem: &mut Problem, variables: &VariableMap, demand: &DemandMap) {
    for dest_id in demand.keys() {
        let terms = variables
            .iter_assignments_for_destination(dest_id)
            .map(|var| (var, 1.0))
            .collect::<Vec<_>>();
        problem.add_row(1.0..=1.0, terms);
    }
}

/// Demand can only be routed to open facilities: `x_fd - y_f <= 0`
fn add_linking_constraints(problem: &mut Problem, variables: &VariableMap) {
    for ((facility_id, _), &var) in &variables.assignment_vars {
        let open = variables.open_vars[facility_id];
        problem.add_row(..=0.0, [(var, 1.0), (open, -1.0)]);
    }
}

/// Demand routed to a facility can't exceed its capacity: `Σ_d demand_d x_fd - cap_f y_f <= 0`
fn add_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    demand: &DemandMap,
    capacity: &CapacityMap,
) {
    for (facility_id, &open) in &variables.open_vars {
        let mut terms = variables
            .assignment_vars
            .iter()
            .filter(|((f, _), _)| f == facility_id)
            .map(|((_, dest_id), &var)| (var, demand[dest_id].value()))
            .collect::<Vec<_>>();
        terms.push((open, -capacity[facility_id].value()));
        problem.add_row(..=0.0, terms);
    }
}

/// The number of open facilities must be within bounds: `min <= Σ_f y_f <= max`
fn add_facility_count_constraint(
    problem: &mut Problem,
    variables: &VariableMap,
    min: usize,
    max: usize,
) {
    let terms = variables
        .open_vars
        .values()
        .map(|&var| (var, 1.0))
        .collect::<Vec<_>>();
    problem.add_row(min as f64..=max as f64, terms);
}
