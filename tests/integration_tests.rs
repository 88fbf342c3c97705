use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use tempfile::TempDir;

// Helper function to create a temporary request file
fn create_request_file(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("request.json");
    fs::write(&file_path, content).expect("Failed to write request file");
    (temp_dir, file_path)
}

fn kalculator() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kalculator"));
    cmd.env_remove("RUST_LOG").env_remove("KALCULATOR_TIME_LIMIT");
    cmd
}

// Helper function to run the planner with the request given inline
fn run_kalculator(request: &str, additional_args: Vec<&str>) -> std::io::Result<Output> {
    let mut cmd = kalculator();
    for arg in additional_args {
        cmd.arg(arg);
    }
    cmd.arg(request).output()
}

// Helper function to run the planner with the request piped on stdin
fn run_kalculator_stdin(request: &str, additional_args: Vec<&str>) -> std::io::Result<Output> {
    let mut child = kalculator()
        .args(additional_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(request.as_bytes())?;
    child.wait_with_output()
}

fn scenario() -> Value {
    json!({
        "financing": {"exPost": 0.4, "exAnte": 0.6},
        "typology": {
            "nbsRemoval": 0.3, "nbsAvoidance": 0.2, "dac": 0.1,
            "biochar": 0.2, "renewableEnergy": 0.2
        },
        "regionAllocation": {
            "northAmerica": 0.1, "southAmerica": 0.2, "europe": 0.3,
            "africa": 0.2, "asia": 0.1, "oceania": 0.1
        },
        "carbonUnitNeeds": {"2025": 5000000, "2040": 10000000, "2050": 40000000},
        "timeConstraints": 1
    })
}

fn parse_plan(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should hold a JSON plan ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[cfg(test)]
mod allocate_regression_tests {
    use super::*;

    /// Test the reference scenario end to end
    #[test]
    fn test_yearly_plan_on_stdout() {
        let output = run_kalculator(&scenario().to_string(), vec![])
            .expect("Failed to run kalculator");

        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let plan = parse_plan(&output);
        let results = plan["results"].as_array().expect("results array");
        assert!(!results.is_empty(), "Plan should contain purchases");
        assert!(plan["total_price"].as_f64().expect("total price") > 0.0);

        for item in results {
            for field in ["year", "quantity", "typology", "region", "price", "type"] {
                assert!(item.get(field).is_some(), "line item lacks {field}: {item}");
            }
            assert!(item["quantity"].as_f64().unwrap() > 0.0);
            let mode = item["type"].as_str().unwrap();
            assert!(mode == "ex-post" || mode == "ex-ante", "unexpected type {mode}");
        }
    }

    /// Test reading the request from a file and writing the optional outputs
    #[test]
    fn test_input_file_with_csv_and_report() {
        let (_temp_dir, input_path) = create_request_file(&scenario().to_string());
        let temp_output_dir = TempDir::new().expect("Failed to create temp dir");
        let csv_path = temp_output_dir.path().join("plan.csv");
        let rpt_path = temp_output_dir.path().join("plan.rpt");

        let output = kalculator()
            .arg("--input")
            .arg(&input_path)
            .arg("--csv")
            .arg(&csv_path)
            .arg("--rpt")
            .arg(&rpt_path)
            .output()
            .expect("Failed to run kalculator");

        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(csv_path.exists(), "CSV file should be generated");
        assert!(rpt_path.exists(), "Report file should be generated");

        let plan = parse_plan(&output);
        let item_count = plan["results"].as_array().unwrap().len();

        let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV file");
        assert!(
            csv_content.starts_with("year,typology,region,type,quantity,price,cost"),
            "CSV should have header"
        );
        assert_eq!(csv_content.lines().count(), item_count + 1);

        let rpt_content = fs::read_to_string(&rpt_path).expect("Failed to read report file");
        assert!(
            rpt_content.contains("Total budget"),
            "Report should contain the total budget"
        );
        assert!(rpt_content.contains("Carbon needs"));
        assert!(rpt_content.contains("Year 2050"));
    }

    /// Test reading the request from stdin
    #[test]
    fn test_request_on_stdin() {
        let mut request = scenario();
        request["timeConstraints"] = json!("FiveYear");

        let output = run_kalculator_stdin(&request.to_string(), vec!["-"])
            .expect("Failed to run kalculator");
        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let plan = parse_plan(&output);
        for item in plan["results"].as_array().unwrap() {
            assert_eq!(item["year"].as_u64().unwrap() % 5, 0);
        }
    }

    /// Test the legacy configuration with blue carbon
    #[test]
    fn test_legacy_profile_with_blue_carbon() {
        let mut request = scenario();
        let typology = request["typology"].as_object_mut().unwrap();
        typology.remove("renewableEnergy");
        typology.insert("blueCarbon".into(), json!(0.2));

        let output = run_kalculator(
            &request.to_string(),
            vec!["--profile", "legacy", "--fifth-typology", "blue-carbon"],
        )
        .expect("Failed to run kalculator");
        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let plan = parse_plan(&output);
        assert!(
            plan["results"]
                .as_array()
                .unwrap()
                .iter()
                .any(|item| item["typology"] == "blueCarbon")
        );

        // The default configuration rejects it
        let output = run_kalculator(&request.to_string(), vec![]).expect("Failed to run kalculator");
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected typology"));
    }
}

#[cfg(test)]
mod error_reporting_tests {
    use super::*;

    /// Test that a missing field is named on stderr
    #[test]
    fn test_missing_field() {
        let mut request = scenario();
        request.as_object_mut().unwrap().remove("financing");

        let output = run_kalculator(&request.to_string(), vec![]).expect("Failed to run kalculator");

        assert!(!output.status.success(), "Command should fail");
        assert!(output.stdout.is_empty(), "Nothing should reach stdout");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Error: missing financing"),
            "stderr should name the field: {stderr}"
        );
    }

    /// Test that malformed JSON is reported
    #[test]
    fn test_malformed_json() {
        let output = run_kalculator("{\"financing\": ", vec![]).expect("Failed to run kalculator");

        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Error: malformed request"));
    }

    /// Test that an out of horizon year is rejected
    #[test]
    fn test_year_out_of_range() {
        let mut request = scenario();
        request["carbonUnitNeeds"] = json!({"2060": 100});

        let output = run_kalculator(&request.to_string(), vec![]).expect("Failed to run kalculator");

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("2060"));
    }

    /// Test that an infeasible request fails without printing a plan
    #[test]
    fn test_infeasible_request() {
        let mut request = scenario();
        request["financing"] = json!({"exPost": 0.0, "exAnte": 1.0});
        request["carbonUnitNeeds"] = json!({"2025": 1000});

        let output = run_kalculator(&request.to_string(), vec![]).expect("Failed to run kalculator");

        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Error: problem infeasible"));
    }

    /// Test that structured logs carry the error kind
    #[test]
    fn test_json_logs_carry_error_kind() {
        let output = run_kalculator("{}", vec!["--log-format", "json"]).expect("Failed to run kalculator");

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("\"kind\":\"missing_input\""), "stderr: {stderr}");
    }

    /// Test that an invalid time limit is refused by the argument parser
    #[test]
    fn test_invalid_time_limit() {
        let output = run_kalculator(&scenario().to_string(), vec!["--time-limit", "-1"])
            .expect("Failed to run kalculator");
        assert!(!output.status.success());
    }
}
