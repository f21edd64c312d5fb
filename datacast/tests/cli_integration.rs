//! Integration tests for datacast CLI

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

const READINGS: &str = r#"[
    {"date": "2020-01-01", "site": "A", "temp": 10},
    {"date": "2020-01-01", "site": "B", "temp": 12},
    {"date": "2020-01-02", "site": "A", "temp": 11},
    {"date": "2020-01-02", "site": "B", "temp": 13}
]"#;

fn run_datacast_with_stdin(args: &[&str], stdin: Option<&str>) -> (Vec<u8>, String, bool) {
    let mut cmd_args = vec!["run", "-q", "-p", "datacast", "--"];
    cmd_args.extend(args);

    let mut child = Command::new("cargo")
        .args(&cmd_args)
        .current_dir(env!("CARGO_MANIFEST_DIR").to_string() + "/..")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("Failed to write stdin");
        }
    }

    let output = child.wait_with_output().expect("Failed to wait for command");
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.stdout, stderr, output.status.success())
}

fn run_datacast(args: &[&str]) -> (String, String, bool) {
    let (stdout, stderr, success) = run_datacast_with_stdin(args, None);
    (String::from_utf8_lossy(&stdout).to_string(), stderr, success)
}

fn readings_file(dir: &TempDir) -> String {
    let path = dir.path().join("readings.json");
    fs::write(&path, READINGS).unwrap();
    path_str(&path)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_datacast(&["--help"]);

    assert!(success);
    assert!(stdout.contains("datacast"));
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--split-by"));
    assert!(stdout.contains("--transform"));
    assert!(stdout.contains("formats"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_datacast(&["--version"]);

    assert!(success);
    assert!(stdout.contains("datacast"));
}

#[test]
fn test_default_csv_output() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (stdout, _, success) = run_datacast(&[&input]);

    assert!(success);
    assert_eq!(
        stdout,
        "date,site,temp\n2020-01-01,A,10\n2020-01-01,B,12\n2020-01-02,A,11\n2020-01-02,B,13\n"
    );
}

#[test]
fn test_pivot_transform() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (stdout, _, success) = run_datacast(&[
        &input,
        "--transform",
        r#"{"operation": "pivot", "key_column": "site", "value_column": "temp", "index_column": "date"}"#,
    ]);

    assert!(success);
    assert_eq!(stdout, ",A,B\n2020-01-01,10,12\n2020-01-02,11,13\n");
}

#[test]
fn test_split_merge_stacks_headers() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let transforms = dir.path().join("transforms.json");
    fs::write(&transforms, r#"[{"operation": "merge"}]"#).unwrap();

    let (stdout, _, success) = run_datacast(&[
        &input,
        "--split-by",
        "site",
        "--index",
        "date",
        "--transforms",
        &path_str(&transforms),
    ]);

    assert!(success);
    assert_eq!(
        stdout,
        ",site=A,site=B\n,temp,temp\n2020-01-01,10,12\n2020-01-02,11,13\n"
    );
}

#[test]
fn test_json_from_stdin() {
    let (stdout, _, success) =
        run_datacast_with_stdin(&["-", "--format", "application/json"], Some(READINGS));

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_slice(&stdout).expect("Invalid JSON output");
    assert_eq!(parsed.as_array().map(Vec::len), Some(4));
    assert_eq!(parsed[1]["site"], "B");
}

#[test]
fn test_accept_list_picks_first_enabled() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (stdout, _, success) = run_datacast(&[
        &input,
        "--columns",
        "date,temp",
        "--permissive",
        "--accept",
        "application/pdf, text/plain",
    ]);

    assert!(success);
    assert!(stdout.starts_with("date"));
    assert!(stdout.contains("----"));
    assert!(!stdout.contains("site"));
}

#[test]
fn test_xlsx_to_file() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let output = dir.path().join("readings.xlsx");
    let (_, _, success) = run_datacast(&[
        &input,
        "--split-by",
        "site",
        "--format",
        "xlsx",
        "--output",
        &path_str(&output),
    ]);

    assert!(success);
    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn test_svg_chart() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (stdout, _, success) = run_datacast(&[
        &input,
        "--format",
        "svg",
        "--transform",
        r#"{"operation": "pivot", "key_column": "site", "value_column": "temp", "index_column": "date"}"#,
        "--transform",
        r#"{"operation": "sort"}"#,
    ]);

    // The index is not plotted; column A is the X axis and B the series.
    assert!(success);
    assert!(stdout.starts_with("<svg"));
    assert!(stdout.contains(">B</text>"));
}

#[test]
fn test_chart_rejects_text_series() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (stdout, stderr, success) = run_datacast(&[&input, "--format", "png"]);

    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("unsupported table shape"));
}

#[test]
fn test_schema_error() {
    let dir = TempDir::new().unwrap();
    let input = readings_file(&dir);
    let (_, stderr, success) = run_datacast(&[&input, "--columns", "date,temp"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("site"));
}

#[test]
fn test_invalid_input_path() {
    let (_, stderr, success) = run_datacast(&["/nonexistent/records.json"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_formats_subcommand() {
    let (stdout, _, success) = run_datacast(&["formats"]);

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("csv"));
    assert!(lines[0].contains("text/csv"));
    assert!(lines[0].contains("(default)"));
    assert!(lines[6].starts_with("svg"));
}

#[test]
fn test_formats_with_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("datacast.toml");
    fs::write(
        &config,
        "[formats]\nenabled = [\"json\", \"csv\"]\ndefault = \"json\"\n",
    )
    .unwrap();

    let (stdout, _, success) = run_datacast(&["formats", "--config", &path_str(&config)]);

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("json"));
    assert!(lines[0].contains("(default)"));
}
