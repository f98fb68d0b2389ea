//! The JSON response returned for a sweep request.
//!
//! Infinite sentinel costs of failed scenarios are written as `null`.
use crate::error::{ErrorKind, PlanningError, PlanningResult};
use crate::estimate::{InventoryEstimate, WarehouseEstimate};
use crate::sweep::{BaselineIntegration, BatchSummary, Scenario, SweepOutcome};
use serde::Serialize;

/// A successful sweep response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResponse {
    /// Always true
    pub ok: bool,
    /// Overview of the sweep
    pub batch_summary: BatchSummary,
    /// Warehouse estimate shared by every scenario
    pub wh: Option<WarehouseEstimate>,
    /// Inventory estimate shared by every scenario
    pub inventory: Option<InventoryEstimate>,
    /// Every scenario, in sweep order
    pub scenarios: Vec<Scenario>,
    /// The best scenario, if any succeeded
    pub best: Option<Scenario>,
    /// Comparison with the baseline
    pub baseline_integration: BaselineIntegration,
}

impl From<SweepOutcome> for SweepResponse {
    fn from(outcome: SweepOutcome) -> Self {
        let best = outcome.best().cloned();
        Self {
            ok: true,
            batch_summary: outcome.batch_summary,
            wh: outcome.warehouse,
            inventory: outcome.inventory,
            scenarios: outcome.scenarios,
            best,
            baseline_integration: outcome.baseline_integration,
        }
    }
}

/// The response when the request couldn't be planned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Summary of the error
    pub error: String,
    /// Details of the error
    pub details: ErrorDetails,
}

/// Details of a failed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetails {
    /// The kind of error
    pub kind: ErrorKind,
    /// Description without the kind prefix
    pub message: String,
}

impl From<&PlanningError> for ErrorResponse {
    fn from(err: &PlanningError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            details: ErrorDetails {
                kind: err.kind(),
                message: err.message().to_string(),
            },
        }
    }
}

/// Either kind of response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// The sweep ran (even if every scenario failed)
    Sweep(Box<SweepResponse>),
    /// The request couldn't be planned
    Error(ErrorResponse),
}

impl Response {
    /// Whether the request was planned
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Sweep(_))
    }
}

/// Convert the result of a sweep into a response
pub fn respond(result: PlanningResult<SweepOutcome>) -> Response {
    match result {
        Ok(outcome) => Response::Sweep(Box::new(outcome.into())),
        Err(err) => Response::Error((&err).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{distance_table, sweep_request};
    use crate::location::DistanceTable;
    use crate::request::SweepRequest;
    use crate::sweep::{Collaborators, sweep};
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    fn test_sweep_response(sweep_request: SweepRequest, distance_table: DistanceTable) {
        let collaborators = Collaborators {
            distances: Some(&distance_table),
            ..Collaborators::default()
        };
        let response = respond(sweep(sweep_request, &collaborators));
        assert!(response.is_ok());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], Value::Bool(true));
        let summary = &json["batch_summary"];
        assert_eq!(summary["scenarios_run"], 1);
        assert_eq!(summary["successful_scenarios"], 1);
        assert_eq!(summary["failed_scenarios"], 0);
        assert_eq!(summary["best_scenario_nodes"], 1);
        assert!(summary["best_scenario_cost"].is_number());
        assert_eq!(json["best"]["nodes"], 1);
        assert_eq!(json["scenarios"][0]["facilities_used"][0], "A");
        assert_eq!(json["baseline_integration"]["fallback_used"], false);
        assert!(json["wh"]["total_cost"].is_number());
    }

    #[test]
    fn test_error_response() {
        let err = PlanningError::Configuration("destinations must contain at least one".into());
        let json = serde_json::to_value(respond(Err(err))).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Invalid configuration: destinations must contain at least one"
        );
        assert_eq!(json["details"]["kind"], "configuration");
    }

    #[rstest]
    fn test_failed_scenario_serialises_null(
        mut sweep_request: SweepRequest,
        distance_table: DistanceTable,
    ) {
        // Four nodes but only three candidates
        sweep_request.scenario.min_nodes = 4;
        sweep_request.scenario.max_nodes = Some(4);
        sweep_request.config.transportation.max_facilities = 4;
        let collaborators = Collaborators {
            distances: Some(&distance_table),
            ..Collaborators::default()
        };
        let json = serde_json::to_value(respond(sweep(sweep_request, &collaborators))).unwrap();

        assert_eq!(json["ok"], true);
        assert!(json["best"].is_null());
        assert_eq!(json["batch_summary"]["failed_scenarios"], 1);
        assert!(json["batch_summary"]["best_scenario_nodes"].is_null());
        let scenario = &json["scenarios"][0];
        assert!(scenario["kpis"]["total_cost"].is_null());
        assert_eq!(scenario["kpis"]["weighted_service_level"], 0.0);
        assert_eq!(scenario["error"]["kind"], "infeasible");
    }
}
