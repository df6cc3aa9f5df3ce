use anyhow::Result;
use std::io::Write;
use std::process::{Command, Output, Stdio};

#[path = "../common/mod.rs"]
mod common;
use common::{Fixture, SALES_CSV};

const PIPELINE_JSON: &str = r#"{
    "name": "cli_report",
    "extract": { "sources": [ { "alias": "sales", "locations": ["sales.csv"] } ] },
    "transform": {
        "operations": [
            { "kind": "aggregate", "function": "SUM", "expression": "sales.qty",
              "group_by_columns": ["sales.product"], "target_column": "total" }
        ]
    },
    "load": { "target_kind": "console", "target_name": "out" }
}"#;

fn etl(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_etl")).args(args).output()?)
}

/// Test that an expression can be evaluated from the command line
#[test]
fn test_cli_eval() -> Result<()> {
    let output = etl(&["eval", "2 + 3 * 4"])?;
    assert!(output.status.success(), "eval command failed");
    assert_eq!(String::from_utf8(output.stdout)?.trim(), "14");

    let output = etl(&["eval", "qty * price", "-r", "sales.qty=4", "--row", "sales.price=2.5"])?;
    assert!(output.status.success(), "eval with a row failed");
    assert_eq!(String::from_utf8(output.stdout)?.trim(), "10");
    Ok(())
}

/// Test that evaluation errors exit with failure
#[test]
fn test_cli_eval_error() -> Result<()> {
    let output = etl(&["eval", "sales.missing + 1"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("sales.missing"), "error should name the column: {}", stderr);
    Ok(())
}

/// Test validate and run on a pipeline file
#[test]
fn test_cli_validate_and_run() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.write("sales.csv", SALES_CSV)?;
    let path = fixture.write("pipeline.json", PIPELINE_JSON)?;
    let path = path.to_string_lossy();

    let output = etl(&["validate", &path])?;
    assert!(output.status.success(), "validate command failed");
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Pipeline 'cli_report' is valid"));
    assert!(stdout.contains("total"));

    let output = etl(&["run", &path])?;
    assert!(output.status.success(), "run command failed");
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("| sales.product | total |"));
    assert!(stdout.contains("| A             | 8     |"));
    assert!(stdout.contains("(2 rows)"));
    Ok(())
}

/// Test that an invalid pipeline is rejected before running
#[test]
fn test_cli_invalid_pipeline() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.write("sales.csv", SALES_CSV)?;
    let path = fixture.write("pipeline.json", &PIPELINE_JSON.replace("sales.qty", "sales.bogus"))?;
    let path = path.to_string_lossy();

    for command in ["validate", "run"] {
        let output = etl(&[command, &path])?;
        assert!(!output.status.success(), "{} accepted an invalid pipeline", command);
        assert!(String::from_utf8(output.stderr)?.contains("sales.bogus"));
    }
    Ok(())
}

/// Test the shell with input redirection
#[test]
fn test_cli_shell_interaction() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut child = Command::new(env!("CARGO_BIN_EXE_etl"))
        .arg("shell")
        .current_dir(fixture.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(stdin) = child.stdin.as_mut() {
        writeln!(stdin, ":set sales.qty 6")?;
        writeln!(stdin, "qty / 4")?;
        writeln!(stdin, "exit")?;
    }
    let output = child.wait_with_output()?;
    assert!(output.status.success(), "shell exited with failure");

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("sales.qty = 6"));
    assert!(stdout.contains("1.5"));
    Ok(())
}
