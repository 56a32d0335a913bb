//! Prompt assembly from sheet-supplied templates.
//!
//! Templates use `{{name}}` placeholders. Substitution is literal: every bound
//! name is replaced wherever it appears and anything else is left untouched, so
//! a template author can see a typo in the rendered prompt instead of losing it.
use std::collections::BTreeMap;

const PLACEHOLDER_PREFIX: &str = "{{";
const PLACEHOLDER_SUFFIX: &str = "}}";

/// Binding name for the stage-one output fed into the message prompt.
pub const DESCRIPTION_BINDING: &str = "company_description";
/// Binding name for the caller's own business description.
pub const SELF_INFO_BINDING: &str = "self_info";

/// Named values available to a template.
pub type Bindings = BTreeMap<&'static str, String>;

/// Replace each `{{name}}` token with its bound value in one left-to-right pass.
///
/// Inserted values are never scanned again, so a value that itself contains a
/// token stays literal.
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_PREFIX.len()..];
        let Some(end) = after.find(PLACEHOLDER_SUFFIX) else {
            rendered.push_str(&rest[start..]);
            return rendered;
        };
        match bindings.get(&after[..end]) {
            Some(value) => {
                rendered.push_str(value);
                rest = &after[end + PLACEHOLDER_SUFFIX.len()..];
            }
            None => {
                rendered.push_str(PLACEHOLDER_PREFIX);
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Percent-encode a value for a query string (`quote_plus` style).
///
/// Spaces become `+`; an empty input stays empty.
pub fn url_encode(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    urlencoding::encode(value).replace("%20", "+")
}

/// Templates and self-description shared by every record in a run.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    search_template: String,
    message_template: String,
    self_info: String,
}

impl PromptBuilder {
    pub fn new(
        search_template: impl Into<String>,
        message_template: impl Into<String>,
        self_info: impl Into<String>,
    ) -> Self {
        Self {
            search_template: search_template.into(),
            message_template: message_template.into(),
            self_info: self_info.into(),
        }
    }

    /// Render the stage-one prompt.
    ///
    /// A blank result falls back to the company URL, then the company name.
    pub fn render_search_prompt(&self, record: &Bindings) -> String {
        let bindings = self.with_self_info(record);
        let prompt = render(&self.search_template, &bindings);
        let prompt = prompt.trim();
        if !prompt.is_empty() {
            return prompt.to_string();
        }
        let url = record.get("company_url").map(String::as_str).unwrap_or("");
        if !url.is_empty() {
            return url.to_string();
        }
        record
            .get("company_name")
            .cloned()
            .unwrap_or_default()
    }

    /// Render the stage-two prompt with the generated description bound.
    pub fn render_message_prompt(&self, record: &Bindings, description: &str) -> String {
        let mut bindings = self.with_self_info(record);
        bindings.insert(DESCRIPTION_BINDING, description.to_string());
        render(&self.message_template, &bindings)
    }

    fn with_self_info(&self, record: &Bindings) -> Bindings {
        let mut bindings = record.clone();
        bindings.insert(SELF_INFO_BINDING, self.self_info.clone());
        bindings
    }
}
