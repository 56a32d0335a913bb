//! In-memory collaborators shared by unit tests.
use crate::generate::{GenerationError, TextGenerator};
use crate::http::HttpError;
use crate::sheets::SheetBackend;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;

pub fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// Sheet that serves canned ranges and records every update.
#[derive(Default)]
pub struct RecordingSheet {
    pub ranges: BTreeMap<String, Vec<Vec<String>>>,
    pub failing_updates: Vec<String>,
    pub fetches: RefCell<Vec<String>>,
    pub updates: RefCell<Vec<(String, Vec<Vec<String>>)>>,
}

impl RecordingSheet {
    pub fn with_range(mut self, range: &str, rows: Vec<Vec<String>>) -> Self {
        self.ranges.insert(range.to_string(), rows);
        self
    }

    pub fn failing_update(mut self, range: &str) -> Self {
        self.failing_updates.push(range.to_string());
        self
    }

    pub fn update_ranges(&self) -> Vec<String> {
        self.updates
            .borrow()
            .iter()
            .map(|(range, _)| range.clone())
            .collect()
    }
}

impl SheetBackend for RecordingSheet {
    fn fetch_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.fetches.borrow_mut().push(range.to_string());
        Ok(self.ranges.get(range).cloned().unwrap_or_default())
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<u64> {
        if self.failing_updates.iter().any(|failing| failing == range) {
            return Err(anyhow!("update {range}: HTTP 503: backend unavailable"));
        }
        self.updates
            .borrow_mut()
            .push((range.to_string(), rows.to_vec()));
        Ok(rows.iter().map(|row| row.len() as u64).sum())
    }
}

type Responder = Box<dyn Fn(&str) -> Result<Value, GenerationError>>;

/// Generator answering each prompt through a closure, recording prompts.
pub struct ScriptedGenerator {
    respond: Responder,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(respond: impl Fn(&str) -> Result<Value, GenerationError> + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Completion-shaped reply of `prefix` plus the prompt.
    pub fn echo(prefix: &'static str) -> Self {
        Self::new(move |prompt| Ok(completion(&format!("{prefix}{prompt}"))))
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn provider(&self) -> &'static str {
        "Scripted"
    }

    fn token_limit(&self) -> u64 {
        256
    }

    fn submit(&self, prompt: &str) -> Result<Value, GenerationError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

pub fn completion(text: &str) -> Value {
    json!({"choices": [{"message": {"content": text}, "finish_reason": "stop"}]})
}

pub fn server_error() -> GenerationError {
    GenerationError::Http {
        provider: "Scripted",
        source: HttpError::Status {
            status: 500,
            message: "upstream exploded".to_string(),
            body: None,
        },
    }
}
