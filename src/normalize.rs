//! Normalization of generation-service payloads into plain text.
//!
//! Three payload shapes reach this module:
//!
//! - **Completion**: `choices[*].message.content`, truncation via
//!   `finish_reason == "length"`.
//! - **Tool response**: `output_text`, else the `output_text` parts of the
//!   `message` items in `output[*]`, truncation via
//!   `status == "incomplete"` with reason `max_output_tokens`.
//! - **Message**: top-level `content[*]` blocks, truncation via
//!   `stop_reason == "max_tokens"`.
//!
//! Other nested content values are classified into a [`Fragment`] and unwrapped by
//! the single recursive [`collect_text`], whichever shape it came from.
use serde_json::{Map, Value};

const TEXT_TYPES: [&str; 3] = ["text", "output_text", "input_text"];
const TOOL_RESULT_TYPE: &str = "tool_result";
const MESSAGE_TYPE: &str = "message";
const OUTPUT_TEXT_TYPE: &str = "output_text";

/// One node of a content tree, tagged by how text is found inside it.
#[derive(Debug)]
enum Fragment<'a> {
    /// A literal string.
    Leaf(&'a str),
    /// An ordered list of parts, concatenated in order.
    Parts(&'a [Value]),
    /// An object, optionally tagged with a `type` discriminator.
    Typed {
        kind: Option<&'a str>,
        fields: &'a Map<String, Value>,
    },
    /// Null, numbers, booleans: never text.
    Opaque,
}

impl<'a> Fragment<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(text) => Fragment::Leaf(text),
            Value::Array(items) => Fragment::Parts(items),
            Value::Object(fields) => Fragment::Typed {
                kind: fields.get("type").and_then(Value::as_str),
                fields,
            },
            _ => Fragment::Opaque,
        }
    }
}

/// Append every non-empty text fragment found in `value` to `out`.
fn collect_text(value: &Value, out: &mut Vec<String>) {
    match Fragment::classify(value) {
        Fragment::Leaf(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Fragment::Parts(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Fragment::Typed {
            kind: Some(kind),
            fields,
        } if TEXT_TYPES.contains(&kind) => {
            if let Some(text) = fields.get("text") {
                collect_text(text, out);
            }
        }
        Fragment::Typed {
            kind: Some(TOOL_RESULT_TYPE),
            fields,
        } => {
            if let Some(content) = fields.get("content") {
                collect_text(content, out);
            }
        }
        Fragment::Typed { fields, .. } => {
            for value in fields.values() {
                collect_text(value, out);
            }
        }
        Fragment::Opaque => {}
    }
}

fn joined_text(value: &Value) -> String {
    let mut parts = Vec::new();
    collect_text(value, &mut parts);
    parts.join("\n")
}

/// Text of one completion choice, falling back to the message refusal.
fn choice_text(choice: &Value) -> String {
    let Some(message) = choice.get("message") else {
        return String::new();
    };
    let text = message.get("content").map(joined_text).unwrap_or_default();
    if !text.is_empty() {
        return text;
    }
    message
        .get("refusal")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}

/// Concatenated `output_text` parts of the `message` items in a tool response.
///
/// `None` when there is no message item. Tool-call items such as
/// `web_search_call` only carry ids and statuses and are never text.
fn message_output_text(output: &[Value]) -> Option<String> {
    let is_message =
        |item: &&Value| item.get("type").and_then(Value::as_str) == Some(MESSAGE_TYPE);
    if !output.iter().any(|item| is_message(&item)) {
        return None;
    }
    let text: String = output
        .iter()
        .filter(is_message)
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some(OUTPUT_TEXT_TYPE))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(text.trim().to_string())
}

/// Aggregate the text of any supported payload shape.
///
/// Returns an empty string when the payload carries no text at all; callers
/// decide whether that is an error.
pub fn extract_text(payload: &Value) -> String {
    if let Some(output_text) = payload.get("output_text").and_then(Value::as_str) {
        let trimmed = output_text.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    if let Some(output) = payload.get("output").filter(|value| value.is_array()) {
        let text = output
            .as_array()
            .map(Vec::as_slice)
            .and_then(message_output_text)
            .unwrap_or_else(|| joined_text(output));
        if !text.is_empty() {
            return text;
        }
    }

    if let Some(choices) = payload.get("choices").and_then(Value::as_array) {
        return choices
            .iter()
            .map(choice_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let Some(content) = payload.get("content").filter(|value| value.is_array()) {
        return joined_text(content);
    }

    String::new()
}

fn eq_lower(value: Option<&Value>, expected: &str) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|text| text.eq_ignore_ascii_case(expected))
}

/// Whether the payload was cut off by an output-length limit.
pub fn is_truncated(payload: &Value) -> bool {
    if let Some(choices) = payload.get("choices").and_then(Value::as_array) {
        return choices
            .iter()
            .any(|choice| eq_lower(choice.get("finish_reason"), "length"));
    }
    if payload.get("stop_reason").is_some() {
        return eq_lower(payload.get("stop_reason"), "max_tokens");
    }
    if !eq_lower(payload.get("status"), "incomplete") {
        return false;
    }
    incomplete_reason(payload)
        .is_some_and(|reason| reason.eq_ignore_ascii_case("max_output_tokens"))
}

/// Whether the payload exposes a completion-style `choices` list.
pub fn has_choices(payload: &Value) -> bool {
    payload.get("choices").is_some_and(Value::is_array)
}

/// The `incomplete_details` reason (or type) of a tool-response payload.
pub fn incomplete_reason(payload: &Value) -> Option<&str> {
    let details = payload.get("incomplete_details")?;
    details
        .get("reason")
        .and_then(Value::as_str)
        .filter(|reason| !reason.is_empty())
        .or_else(|| details.get("type").and_then(Value::as_str))
}

/// The output-token cap echoed back by a tool-response payload.
pub fn echoed_token_limit(payload: &Value) -> Option<u64> {
    payload.get("max_output_tokens").and_then(Value::as_u64)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
