//! Integration tests for the `run` command.
use netplan::cli::{RunOpts, handle_run_command};
use netplan::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the simple example request.
fn get_request_path() -> PathBuf {
    PathBuf::from("demos/simple/request.json")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("NETPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    {
        // Save results to non-existent directory to check that directory creation works
        let output_dir = tempdir.path().join("results");
        let opts = RunOpts {
            output_dir: Some(output_dir.clone()),
            debug_model: true,
            ..RunOpts::default()
        };
        let response =
            handle_run_command(&get_request_path(), &opts, Some(Settings::default())).unwrap();
        assert!(response.is_ok());

        for file_name in [
            "response.json",
            "scenarios.csv",
            "debug_allocations.csv",
            "metadata.toml",
            "netplan_info.log",
            "netplan_error.log",
        ] {
            assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
        }

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output_dir.join("response.json")).unwrap())
                .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["batch_summary"]["scenarios_run"], 4);
        assert!(json["best"]["nodes"].is_number());
    }

    // Second time will fail because the logging is already initialised
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("again")),
        ..RunOpts::default()
    };
    assert_eq!(
        handle_run_command(&get_request_path(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
