//! Per-record enrichment loop.
//!
//! Records are processed strictly in order. For each one the orchestrator
//! decides which stages must run, generates their text, and writes the result
//! columns back. A failure in one record is reported and recorded as a
//! [`RecordOutcome::Failed`]; it never stops the run.
use crate::columns::{ColumnRoleMap, Stages};
use crate::generate::TextGenerator;
use crate::prompt::PromptBuilder;
use crate::records::CompanyRecord;
use crate::sheets::{cell_range, span_range, SheetBackend};
use anyhow::{anyhow, Result};
use std::time::Duration;

/// Run-wide switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sheet_name: String,
    pub stages: Stages,
    /// Regenerate result columns even when they already hold text.
    pub overwrite: bool,
    /// Report intended writes without calling the sheet.
    pub dry_run: bool,
    /// Pause after each written (or dry-run) record.
    pub request_interval: Duration,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Written { ranges: Vec<String>, cells: u64 },
    DryRun { ranges: Vec<String> },
    /// Every result column already had text and overwrite was off.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Row number and outcome, in processing order.
    pub outcomes: Vec<(usize, RecordOutcome)>,
}

impl RunSummary {
    /// Records written or reported by a dry run.
    pub fn processed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    RecordOutcome::Written { .. } | RecordOutcome::DryRun { .. }
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RecordOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RecordOutcome::Skipped))
            .count()
    }
}

/// Result values staged in memory before write-back.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedValues {
    search_result: String,
    /// `Some` exactly when the run has a second stage.
    sales_letter: Option<String>,
}

/// One `update_values` call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CellWrite {
    range: String,
    values: Vec<String>,
}

struct SecondStage<'a> {
    generator: &'a dyn TextGenerator,
    column: usize,
}

pub struct Orchestrator<'a> {
    sheet: &'a dyn SheetBackend,
    prompts: &'a PromptBuilder,
    columns: &'a ColumnRoleMap,
    search: &'a dyn TextGenerator,
    second: Option<SecondStage<'a>>,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    /// Wire an orchestrator; a chained run needs both a sales-letter column
    /// and a message generator.
    pub fn new(
        sheet: &'a dyn SheetBackend,
        prompts: &'a PromptBuilder,
        columns: &'a ColumnRoleMap,
        search: &'a dyn TextGenerator,
        message: Option<&'a dyn TextGenerator>,
        options: RunOptions,
    ) -> Result<Self> {
        let second = match (options.stages, columns.sales_letter, message) {
            (Stages::Single, _, _) => None,
            (Stages::Chained, Some(column), Some(generator)) => {
                Some(SecondStage { generator, column })
            }
            (Stages::Chained, None, _) => {
                return Err(anyhow!("chained run has no sales letter column"));
            }
            (Stages::Chained, _, None) => {
                return Err(anyhow!("chained run has no message generator"));
            }
        };
        Ok(Self {
            sheet,
            prompts,
            columns,
            search,
            second,
            options,
        })
    }

    /// Process every record in order.
    pub fn run(&self, records: &[CompanyRecord]) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in records {
            let outcome = self.process(record);
            let paces = matches!(
                outcome,
                RecordOutcome::Written { .. } | RecordOutcome::DryRun { .. }
            );
            summary.outcomes.push((record.row_number, outcome));
            if paces && !self.options.request_interval.is_zero() {
                std::thread::sleep(self.options.request_interval);
            }
        }
        summary
    }

    fn process(&self, record: &CompanyRecord) -> RecordOutcome {
        let staged = match self.generate(record) {
            Ok(Some(staged)) => staged,
            Ok(None) => {
                println!(
                    "[skip] Row {} already filled for {}",
                    record.row_number,
                    record.identifier()
                );
                return RecordOutcome::Skipped;
            }
            Err(err) => return self.fail(record, err),
        };

        let writes = self.planned_writes(record.row_number, &staged);
        let ranges: Vec<String> = writes.iter().map(|write| write.range.clone()).collect();

        if self.options.dry_run {
            println!("[dry-run] Would update {}", ranges.join(" and "));
            return RecordOutcome::DryRun { ranges };
        }

        let mut cells = 0;
        for write in &writes {
            match self.sheet.update_values(&write.range, &[write.values.clone()]) {
                Ok(updated) => {
                    println!("[write] Updated {} ({updated} cells)", write.range);
                    cells += updated;
                }
                Err(err) => return self.fail(record, err),
            }
        }
        RecordOutcome::Written { ranges, cells }
    }

    fn fail(&self, record: &CompanyRecord, err: anyhow::Error) -> RecordOutcome {
        let reason = format!("{err:#}");
        eprintln!("[error] {}: {reason}", record.identifier());
        tracing::warn!(
            row = record.row_number,
            name = %record.name,
            url = %record.url,
            error = %reason,
            "record failed"
        );
        RecordOutcome::Failed { reason }
    }

    /// Run whichever stages the record needs.
    ///
    /// Returns `None` when nothing had to be generated.
    fn generate(&self, record: &CompanyRecord) -> Result<Option<StagedValues>> {
        let overwrite = self.options.overwrite;
        let bindings = record.prompt_bindings();
        let mut generated = false;

        let search_result = if overwrite || record.search_result.is_empty() {
            let prompt = self.prompts.render_search_prompt(&bindings);
            tracing::debug!(
                row = record.row_number,
                sheet = %self.options.sheet_name,
                prompt = %prompt,
                "rendered search prompt"
            );
            generated = true;
            self.search.generate(&prompt)?
        } else {
            record.search_result.clone()
        };

        let sales_letter = match &self.second {
            None => None,
            Some(stage) => {
                let needed = !search_result.is_empty()
                    && (overwrite || record.sales_letter.is_empty());
                if needed {
                    let prompt = self.prompts.render_message_prompt(&bindings, &search_result);
                    tracing::debug!(row = record.row_number, "rendered message prompt");
                    generated = true;
                    Some(stage.generator.generate(&prompt)?)
                } else {
                    Some(record.sales_letter.clone())
                }
            }
        };

        if !generated {
            return Ok(None);
        }
        Ok(Some(StagedValues {
            search_result,
            sales_letter,
        }))
    }

    /// Adjacent result columns share one write; otherwise one write per cell.
    fn planned_writes(&self, row: usize, staged: &StagedValues) -> Vec<CellWrite> {
        let sheet = &self.options.sheet_name;
        let first = self.columns.search_result;
        let search_write = CellWrite {
            range: cell_range(sheet, first, row),
            values: vec![staged.search_result.clone()],
        };
        let (Some(stage), Some(letter)) = (&self.second, &staged.sales_letter) else {
            return vec![search_write];
        };
        if stage.column == first + 1 {
            return vec![CellWrite {
                range: span_range(sheet, first, stage.column, row),
                values: vec![staged.search_result.clone(), letter.clone()],
            }];
        }
        vec![
            search_write,
            CellWrite {
                range: cell_range(sheet, stage.column, row),
                values: vec![letter.clone()],
            },
        ]
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
