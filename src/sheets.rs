//! Google Sheets access over the v4 REST API.
//!
//! The pipeline only needs two calls, so the backend is a small trait with a
//! blocking `ureq` implementation. Tests substitute an in-memory sheet.
use crate::columns::column_letter;
use crate::config::SheetsConfig;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::env;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const SHEETS_TIMEOUT: Duration = Duration::from_secs(60);

/// Read/write access to one spreadsheet.
pub trait SheetBackend {
    /// Cell values for an A1 range. Rows may be shorter than the range.
    fn fetch_values(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write one rectangular block and return the number of cells updated.
    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<u64>;
}

/// Blocking client bound to a single spreadsheet ID.
pub struct GoogleSheetsClient {
    agent: ureq::Agent,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig, spreadsheet_id: &str) -> Result<Self> {
        if spreadsheet_id.trim().is_empty() {
            return Err(anyhow!("spreadsheet_id is required"));
        }
        let access_token = resolve_access_token(config)?;
        Ok(Self {
            agent: crate::http::agent(SHEETS_TIMEOUT),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.api_base,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl SheetBackend for GoogleSheetsClient {
    fn fetch_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let start = Instant::now();
        let response = self
            .agent
            .get(self.values_url(range))
            .header("Authorization", self.bearer())
            .call()
            .with_context(|| format!("fetch {range}"))?;
        let body = crate::http::read_json(response).with_context(|| format!("fetch {range}"))?;
        tracing::debug!(
            range,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sheet fetch complete"
        );
        Ok(parse_values(&body))
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<u64> {
        let start = Instant::now();
        let payload = json!({ "range": range, "values": rows });
        let response = self
            .agent
            .put(self.values_url(range))
            .query("valueInputOption", "USER_ENTERED")
            .header("Authorization", self.bearer())
            .send_json(&payload)
            .with_context(|| format!("update {range}"))?;
        let body = crate::http::read_json(response).with_context(|| format!("update {range}"))?;
        let updated = body.get("updatedCells").and_then(Value::as_u64).unwrap_or(0);
        tracing::debug!(
            range,
            updated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sheet update complete"
        );
        Ok(updated)
    }
}

/// Convert a `values` response body into rows of strings.
fn parse_values(body: &Value) -> Vec<Vec<String>> {
    let Some(rows) = body.get("values").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(cell_text).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Resolve the OAuth bearer token for the Sheets API.
///
/// Order: explicit `access_token`, the `access_token_env` variable, then the
/// stdout of `token_command`.
pub fn resolve_access_token(config: &SheetsConfig) -> Result<String> {
    if let Some(token) = config
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        return Ok(token.to_string());
    }
    if let Ok(token) = env::var(&config.access_token_env) {
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }
    if let Some(command) = config
        .token_command
        .as_deref()
        .filter(|command| !command.trim().is_empty())
    {
        return run_token_command(command);
    }
    Err(anyhow!(
        "Google Sheets access token is not configured; set sheets.access_token, {}, or sheets.token_command",
        config.access_token_env
    ))
}

fn run_token_command(command: &str) -> Result<String> {
    let args =
        shell_words::split(command).with_context(|| format!("parse token command: {command}"))?;
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("token command is empty"))?;
    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("run token command: {program}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "token command failed with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    let token = String::from_utf8(output.stdout).context("decode token command stdout")?;
    let token = token.trim();
    if token.is_empty() {
        return Err(anyhow!("token command produced no output"));
    }
    Ok(token.to_string())
}

/// Read the first cell of a range, failing when the range is empty.
pub fn read_single_cell(sheet: &dyn SheetBackend, range: &str) -> Result<String> {
    let rows = sheet.fetch_values(range)?;
    rows.into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .ok_or_else(|| anyhow!("range {range} is empty; check spreadsheet setup"))
}

/// Sheet name as it must appear before `!` in an A1 range.
pub fn sheet_prefix(sheet_name: &str) -> String {
    let bare = !sheet_name.is_empty()
        && sheet_name
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_');
    if bare {
        sheet_name.to_string()
    } else {
        format!("'{}'", sheet_name.replace('\'', "''"))
    }
}

/// A1 address of a single cell, e.g. `結果!C5`.
pub fn cell_range(sheet_name: &str, column: usize, row: usize) -> String {
    format!("{}!{}{row}", sheet_prefix(sheet_name), column_letter(column))
}

/// A1 address of a horizontal span on one row, e.g. `結果!C5:D5`.
pub fn span_range(sheet_name: &str, first: usize, last: usize, row: usize) -> String {
    format!(
        "{}!{}{row}:{}{row}",
        sheet_prefix(sheet_name),
        column_letter(first),
        column_letter(last)
    )
}

/// Header row range (`A1:ZZ1`).
pub fn header_range(sheet_name: &str) -> String {
    format!("{}!A1:ZZ1", sheet_prefix(sheet_name))
}

/// Open-ended data range starting at `start_row`.
pub fn data_range(sheet_name: &str, start_row: usize) -> String {
    format!("{}!A{start_row}:ZZ", sheet_prefix(sheet_name))
}
