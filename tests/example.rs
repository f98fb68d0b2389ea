//! Integration tests for the `example` commands.
use netplan::baseline::DEFAULT_BASELINE_COST;
use netplan::cli::RunOpts;
use netplan::cli::example::{example_names, handle_example_run_command};
use netplan::response::Response;
use netplan::settings::Settings;
use netplan::units::Money;
use tempfile::tempdir;

#[test]
fn test_example_names() {
    let mut names: Vec<_> = example_names().collect();
    names.sort_unstable();
    assert_eq!(names, ["growth", "simple"]);
}

/// An integration test for the `example run` command.
///
/// The growth example bundles its own baseline file, which should be used instead of the default.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("NETPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("growth")),
        ..RunOpts::default()
    };
    let response = handle_example_run_command("growth", opts, Some(Settings::default())).unwrap();

    let Response::Sweep(sweep) = response else {
        panic!("Example request could not be planned");
    };
    let baseline = &sweep.baseline_integration;
    assert!(!baseline.fallback_used);
    assert_eq!(baseline.historical_baseline, Money(3_800_000.0));
    assert_ne!(baseline.historical_baseline, DEFAULT_BASELINE_COST);
    assert_eq!(baseline.horizon_years, 3);
    assert_eq!(sweep.scenarios.len(), 4);
}
