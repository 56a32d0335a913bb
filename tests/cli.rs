//! End-to-end checks of the `sheet-enrich` binary that fail before any
//! network call is made.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn sheet_enrich(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sheet-enrich"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("SHEET_ENRICH_TEST_OPENAI_KEY")
        .output()
        .expect("run sheet-enrich")
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(json.as_bytes()).expect("write config");
    file
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_both_jobs() {
    let output = sheet_enrich(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fill"));
    assert!(stdout.contains("search"));
}

#[test]
fn missing_config_file_is_fatal() {
    let output = sheet_enrich(&["fill", "--config", "/nonexistent/sheet-enrich.json"]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("read config /nonexistent/sheet-enrich.json"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn fill_requires_message_template_range() {
    let config = write_config(
        r#"{"spreadsheet_id": "sheet-1",
            "ranges": {"search_prompt_template": "設定!B1", "business_info": "設定!B3"}}"#,
    );
    let output = sheet_enrich(&["fill", "--config", path_arg(config.path())]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("ranges.message_prompt_template is required"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn missing_api_key_names_the_variable() {
    let config = write_config(
        r#"{"spreadsheet_id": "sheet-1",
            "ranges": {"search_prompt_template": "設定!B1", "business_info": "設定!B3"},
            "openai": {"api_key_env": "SHEET_ENRICH_TEST_OPENAI_KEY"}}"#,
    );
    let output = sheet_enrich(&["search", "--config", path_arg(config.path())]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("set SHEET_ENRICH_TEST_OPENAI_KEY"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn debug_payload_without_query_is_rejected() {
    let output = sheet_enrich(&["search", "--config", "c.json", "--debug-payload"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--query"));
}
