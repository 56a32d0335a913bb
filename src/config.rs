//! Job configuration loaded from a JSON file.
//!
//! Every section except `spreadsheet_id` and `ranges` has defaults so a minimal
//! config only names the sheet and where the templates live.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OUTPUT_SHEET: &str = "結果";
pub const DEFAULT_START_ROW: usize = 2;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5";
pub const DEFAULT_OPENAI_MAX_TOKENS: u64 = 10_000;
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-opus-4-1-20250805";
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u64 = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheets: SheetsConfig,
    pub ranges: RangesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    /// Seconds to wait between records; overrides the per-provider values.
    #[serde(default)]
    pub request_interval: Option<f64>,
}

/// Sheets API endpoint and OAuth token sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub access_token: Option<String>,
    pub access_token_env: String,
    /// Command printing a bearer token, e.g. `gcloud auth print-access-token`.
    pub token_command: Option<String>,
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            access_token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
            token_command: None,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
        }
    }
}

/// A1 ranges holding the prompt templates and the self-description.
#[derive(Debug, Clone, Deserialize)]
pub struct RangesConfig {
    pub search_prompt_template: String,
    /// Needed only when a sales letter is generated.
    #[serde(default)]
    pub message_prompt_template: Option<String>,
    pub business_info: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub sheet_name: String,
    /// 1-based row of the first data row (the header is row 1).
    pub start_row: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_OUTPUT_SHEET.to_string(),
            start_row: DEFAULT_START_ROW,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub max_tokens: u64,
    pub temperature: Option<f64>,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub api_base: String,
    pub request_interval: Option<f64>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_OPENAI_MODEL.to_string(),
            max_tokens: DEFAULT_OPENAI_MAX_TOKENS,
            temperature: None,
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            request_interval: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u64,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub api_base: String,
    pub request_interval: Option<f64>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_ANTHROPIC_MAX_TOKENS,
            api_key: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_base: "https://api.anthropic.com/v1".to_string(),
            request_interval: None,
        }
    }
}

impl AppConfig {
    /// Delay between records: top level, then anthropic, then openai.
    pub fn request_interval(&self) -> Duration {
        let seconds = self
            .request_interval
            .or(self.anthropic.request_interval)
            .or(self.openai.request_interval)
            .unwrap_or(0.0);
        if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }

    /// Check fields whose absence would only surface mid-run.
    pub fn validate(&self, needs_message_template: bool) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(anyhow!("spreadsheet_id must be non-empty"));
        }
        if self.output.start_row < 2 {
            return Err(anyhow!(
                "output.start_row must be 2 or greater (row 1 is the header), got {}",
                self.output.start_row
            ));
        }
        if self.output.sheet_name.trim().is_empty() {
            return Err(anyhow!("output.sheet_name must be non-empty"));
        }
        if needs_message_template
            && self
                .ranges
                .message_prompt_template
                .as_deref()
                .is_none_or(|range| range.trim().is_empty())
        {
            return Err(anyhow!(
                "ranges.message_prompt_template is required to generate sales letters"
            ));
        }
        Ok(())
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: AppConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Load `.env` beside the config file, then from the working directory.
///
/// Variables already set in the environment are never overridden.
pub fn load_dotenv(config_path: &Path) {
    if let Some(dir) = config_path.parent() {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            if let Err(err) = dotenvy::from_path(&candidate) {
                tracing::warn!(path = %candidate.display(), error = %err, "failed to load .env");
            }
        }
    }
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!(error = %err, "failed to load .env from working directory");
        }
    }
}

/// An explicit key, else the trimmed value of `env_var`.
pub fn read_api_key(explicit: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(key) = explicit.map(str::trim).filter(|key| !key.is_empty()) {
        return Some(key.to_string());
    }
    env::var(env_var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Like [`read_api_key`] but fatal when nothing is configured.
pub fn require_api_key(provider: &str, explicit: Option<&str>, env_var: &str) -> Result<String> {
    read_api_key(explicit, env_var).ok_or_else(|| {
        anyhow!(
            "{provider} API key is not configured; provide it in the config or set {env_var}"
        )
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
