//! Job entry points behind the CLI subcommands.
//!
//! Setup (config, credentials, templates, header, records) is fatal on any
//! error; once records are built the orchestrator owns per-record failures.
use crate::cli::{FillArgs, JobArgs, SearchArgs};
use crate::columns::{self, ColumnRoleMap, Stages};
use crate::config::{self, AppConfig};
use crate::generate::{text_from_payload, ClaudeClient, OpenAiClient, OpenAiMode, TextGenerator};
use crate::pipeline::{Orchestrator, RunOptions};
use crate::prompt::PromptBuilder;
use crate::records::{build_records, CompanyRecord};
use crate::sheets::{data_range, header_range, read_single_cell, GoogleSheetsClient, SheetBackend};
use anyhow::{anyhow, Context, Result};

pub fn run_fill(args: FillArgs) -> Result<()> {
    run_job(&args.job, Stages::Chained)
}

pub fn run_search(args: SearchArgs) -> Result<()> {
    match args.query.as_deref() {
        Some(query) => run_query(&args.job, query, args.debug_payload),
        None => run_job(&args.job, Stages::Single),
    }
}

/// Everything read from the sheet before the first generation call.
pub(crate) struct Prepared {
    pub prompts: PromptBuilder,
    pub columns: ColumnRoleMap,
    pub records: Vec<CompanyRecord>,
}

fn load(job: &JobArgs) -> Result<AppConfig> {
    let config = config::load_config(&job.config)?;
    config::load_dotenv(&job.config);
    Ok(config)
}

fn run_job(job: &JobArgs, stages: Stages) -> Result<()> {
    let config = load(job)?;
    config.validate(stages == Stages::Chained)?;

    let openai_key = config::require_api_key(
        "OpenAI",
        config.openai.api_key.as_deref(),
        &config.openai.api_key_env,
    )?;
    let anthropic_key = match stages {
        Stages::Single => None,
        Stages::Chained => Some(config::require_api_key(
            "Anthropic",
            config.anthropic.api_key.as_deref(),
            &config.anthropic.api_key_env,
        )?),
    };

    let sheet = GoogleSheetsClient::new(&config.sheets, &config.spreadsheet_id)?;
    let prepared = prepare(&sheet, &config, stages, job.limit)?;
    let sheet_name = &config.output.sheet_name;
    if prepared.records.is_empty() {
        println!("No company rows found in {sheet_name}; nothing to do.");
        return Ok(());
    }
    tracing::debug!(
        records = prepared.records.len(),
        sheet = %sheet_name,
        ?stages,
        "records prepared"
    );

    let mode = if job.web_search {
        OpenAiMode::WebSearch
    } else {
        OpenAiMode::Completion
    };
    let search = OpenAiClient::new(&config.openai, openai_key, mode);
    let message = anthropic_key.map(|key| ClaudeClient::new(&config.anthropic, key));

    let options = RunOptions {
        sheet_name: sheet_name.clone(),
        stages,
        overwrite: job.overwrite,
        dry_run: job.dry_run,
        request_interval: config.request_interval(),
    };
    let orchestrator = Orchestrator::new(
        &sheet,
        &prepared.prompts,
        &prepared.columns,
        &search,
        message.as_ref().map(|client| client as &dyn TextGenerator),
        options,
    )?;
    let summary = orchestrator.run(&prepared.records);
    tracing::info!(
        processed = summary.processed(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "run finished"
    );
    match stages {
        Stages::Chained => println!("Completed processing {} companies.", summary.processed()),
        Stages::Single => println!(
            "Completed generating search results for {} rows.",
            summary.processed()
        ),
    }
    Ok(())
}

/// Read templates, resolve the header, and build the record list.
///
/// `limit` applies after rows without identity fields are dropped.
pub(crate) fn prepare(
    sheet: &dyn SheetBackend,
    config: &AppConfig,
    stages: Stages,
    limit: Option<usize>,
) -> Result<Prepared> {
    let ranges = &config.ranges;
    let search_template = read_single_cell(sheet, &ranges.search_prompt_template)
        .context("read search prompt template")?;
    let message_template = match stages {
        Stages::Single => String::new(),
        Stages::Chained => {
            let range = ranges
                .message_prompt_template
                .as_deref()
                .ok_or_else(|| anyhow!("ranges.message_prompt_template is not configured"))?;
            read_single_cell(sheet, range).context("read message prompt template")?
        }
    };
    let self_info =
        read_single_cell(sheet, &ranges.business_info).context("read business info")?;

    let output = &config.output;
    let header_range = header_range(&output.sheet_name);
    let header = sheet
        .fetch_values(&header_range)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("header row could not be fetched from {header_range}"))?;
    let columns = columns::resolve(&header, stages)
        .with_context(|| format!("resolve columns in {}", output.sheet_name))?;

    let rows = sheet.fetch_values(&data_range(&output.sheet_name, output.start_row))?;
    let mut records = build_records(&rows, &columns, output.start_row);
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    Ok(Prepared {
        prompts: PromptBuilder::new(search_template, message_template, self_info),
        columns,
        records,
    })
}

/// One web-search generation outside the sheet.
fn run_query(job: &JobArgs, query: &str, debug_payload: bool) -> Result<()> {
    let config = load(job)?;
    let key = config::require_api_key(
        "OpenAI",
        config.openai.api_key.as_deref(),
        &config.openai.api_key_env,
    )?;
    let client = OpenAiClient::new(&config.openai, key, OpenAiMode::WebSearch);
    println!("{}", query_output(&client, query, debug_payload)?);
    Ok(())
}

fn query_output(client: &dyn TextGenerator, query: &str, debug_payload: bool) -> Result<String> {
    let payload = client.submit(query.trim())?;
    let mut output = String::new();
    if debug_payload {
        let pretty = serde_json::to_string_pretty(&payload).context("format payload")?;
        output.push_str(&format!("[payload]\n{pretty}\n"));
    }
    let text = text_from_payload(client.provider(), &payload, client.token_limit())?;
    output.push_str(&format!("[result]\n{text}"));
    Ok(output)
}
