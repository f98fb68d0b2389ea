//! Writing the results of a sweep to disk.
use crate::error::ErrorKind;
use crate::facility::FacilityID;
use crate::response::{Response, SweepResponse};
use crate::sweep::Scenario;
use crate::units::{Dimensionless, Money, MoneyPerQuantity, Quantity};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which request-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "netplan_results";

/// The full JSON response
const RESPONSE_FILE_NAME: &str = "response.json";

/// One row per scenario
const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// Per-year facility allocations for every solved scenario
const ALLOCATIONS_FILE_NAME: &str = "debug_allocations.csv";

/// Get the default output directory for the request at `request_path`
pub fn get_output_dir(request_path: &Path) -> Result<PathBuf> {
    let request_name = request_path
        .file_stem()
        .context("Request path has no file name")?
        .to_str()
        .context("Invalid chars in request file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, request_name].iter().collect())
}

/// Create the output directory, with parents.
///
/// # Returns
///
/// True if an existing directory with files in it will be overwritten. It is an error for the
/// directory to be non-empty unless `allow_overwrite` is set.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// A row of the scenarios CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ScenarioRow {
    nodes: usize,
    success: bool,
    is_best: bool,
    error_kind: Option<ErrorKind>,
    total_cost: Money,
    transportation_cost: Money,
    warehouse_cost: Money,
    inventory_cost: Money,
    weighted_service_level: Dimensionless,
    meets_service_requirement: bool,
    facilities_opened: usize,
    avg_cost_per_unit: MoneyPerQuantity,
    savings: Money,
    savings_percent: f64,
    facilities_used: String,
}

impl ScenarioRow {
    fn new(scenario: &Scenario, is_best: bool) -> Self {
        let kpis = &scenario.kpis;
        Self {
            nodes: scenario.nodes,
            success: scenario.is_success(),
            is_best,
            error_kind: scenario.error().map(|err| err.kind),
            total_cost: kpis.total_cost,
            transportation_cost: kpis.transportation_cost,
            warehouse_cost: kpis.warehouse_cost,
            inventory_cost: kpis.inventory_cost,
            weighted_service_level: kpis.weighted_service_level,
            meets_service_requirement: kpis.meets_service_requirement,
            facilities_opened: kpis.facilities_opened,
            avg_cost_per_unit: kpis.avg_cost_per_unit,
            savings: kpis.savings,
            savings_percent: kpis.savings_percent,
            facilities_used: scenario.facilities_used().iter().join(";"),
        }
    }
}

/// A row of the allocations CSV file
#[derive(Serialize, Debug, PartialEq)]
struct AllocationRow {
    nodes: usize,
    year: u32,
    facility: FacilityID,
    open: bool,
    assigned: Quantity,
    capacity: Quantity,
    utilization: Dimensionless,
}

/// Writes sweep results to an output directory
pub struct ResultsWriter {
    output_path: PathBuf,
    scenarios_writer: csv::Writer<File>,
    allocations_writer: Option<csv::Writer<File>>,
}

impl ResultsWriter {
    /// Open the output files
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to also write per-year allocations
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| csv::Writer::from_path(output_path.join(file_name));
        let allocations_writer = if save_debug_info {
            Some(new_writer(ALLOCATIONS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            scenarios_writer: new_writer(SCENARIOS_FILE_NAME)?,
            allocations_writer,
        })
    }

    /// Write the response and, for a completed sweep, the per-scenario tables
    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        let json = serde_json::to_string_pretty(response)?;
        fs::write(self.output_path.join(RESPONSE_FILE_NAME), json)?;

        if let Response::Sweep(sweep) = response {
            self.write_scenarios(sweep)?;
            self.write_allocations(&sweep.scenarios)?;
        }

        Ok(())
    }

    fn write_scenarios(&mut self, sweep: &SweepResponse) -> Result<()> {
        let best_nodes = sweep.batch_summary.best_scenario_nodes;
        for scenario in &sweep.scenarios {
            let is_best = best_nodes == Some(scenario.nodes);
            self.scenarios_writer
                .serialize(ScenarioRow::new(scenario, is_best))?;
        }

        Ok(())
    }

    fn write_allocations(&mut self, scenarios: &[Scenario]) -> Result<()> {
        let Some(writer) = &mut self.allocations_writer else {
            return Ok(());
        };

        for scenario in scenarios {
            let Some(plan) = scenario.plan() else {
                continue;
            };
            for year in &plan.years {
                for allocation in &year.solution.allocations {
                    writer.serialize(AllocationRow {
                        nodes: scenario.nodes,
                        year: year.year,
                        facility: allocation.facility.clone(),
                        open: allocation.open,
                        assigned: allocation.assigned,
                        capacity: allocation.capacity,
                        utilization: allocation.utilization,
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.scenarios_writer.flush()?;
        if let Some(writer) = &mut self.allocations_writer {
            writer.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{distance_table, sweep_request};
    use crate::location::DistanceTable;
    use crate::request::SweepRequest;
    use crate::response::respond;
    use crate::sweep::{Collaborators, sweep};
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(String::from).collect();
        let records = reader
            .records()
            .map(|record| record.unwrap().iter().map(String::from).collect())
            .collect();
        (headers, records)
    }

    #[test]
    fn test_get_output_dir() {
        assert_eq!(
            get_output_dir(Path::new("requests/growth.json")).unwrap(),
            PathBuf::from("netplan_results/growth")
        );
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New and empty directories are fine
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(!create_output_directory(&output_dir, false).unwrap());

        fs::write(output_dir.join("response.json"), "{}").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("response.json").exists());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_write_response(
        #[case] debug: bool,
        mut sweep_request: SweepRequest,
        distance_table: DistanceTable,
    ) {
        sweep_request.scenario.max_nodes = Some(2);
        let collaborators = Collaborators {
            distances: Some(&distance_table),
            ..Collaborators::default()
        };
        let response = respond(sweep(sweep_request, &collaborators));

        let dir = tempdir().unwrap();
        {
            let mut writer = ResultsWriter::create(dir.path(), debug).unwrap();
            writer.write_response(&response).unwrap();
            writer.flush().unwrap();
        }

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(RESPONSE_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(json["ok"], true);

        let (headers, records) = read_csv(&dir.path().join(SCENARIOS_FILE_NAME));
        assert_eq!(headers[0], "nodes");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][0], "1");
        assert_eq!(records[1][0], "2");
        assert_eq!(
            records.iter().filter(|record| record[2] == "true").count(),
            1
        );

        let allocations = dir.path().join(ALLOCATIONS_FILE_NAME);
        assert_eq!(allocations.exists(), debug);
        if debug {
            let (headers, records) = read_csv(&allocations);
            assert_eq!(headers[2], "facility");
            assert!(!records.is_empty());
        }
    }

    #[test]
    fn test_write_error_response() {
        let dir = tempdir().unwrap();
        let response = respond(Err(crate::error::PlanningError::Configuration(
            "forecast must contain at least one year".into(),
        )));
        {
            let mut writer = ResultsWriter::create(dir.path(), false).unwrap();
            writer.write_response(&response).unwrap();
            writer.flush().unwrap();
        }

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(RESPONSE_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(json["success"], false);
        let (_, records) = read_csv(&dir.path().join(SCENARIOS_FILE_NAME));
        assert!(records.is_empty());
    }
}
