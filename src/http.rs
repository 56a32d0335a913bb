//! Shared blocking HTTP plumbing for the Sheets and generation clients.
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use ureq::http::Response;
use ureq::Body;

/// Largest slice of an unparseable error body kept in messages.
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Parsed error body, when it was JSON.
        body: Option<Value>,
    },
    #[error("transport error")]
    Transport(#[from] ureq::Error),
    #[error("decode response JSON")]
    Decode(#[from] serde_json::Error),
}

impl HttpError {
    /// The `error` object of a JSON error body, if any.
    pub fn error_detail(&self) -> Option<&Value> {
        match self {
            HttpError::Status {
                body: Some(body), ..
            } => body.get("error"),
            _ => None,
        }
    }
}

/// Agent that reports HTTP status codes to the caller instead of failing.
pub fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Read a JSON body, turning non-success statuses into [`HttpError::Status`].
pub fn read_json(mut response: Response<Body>) -> Result<Value, HttpError> {
    let status = response.status();
    let text = response.body_mut().read_to_string()?;
    if status.is_success() {
        return Ok(serde_json::from_str(&text)?);
    }
    let body: Option<Value> = serde_json::from_str(&text).ok();
    let message = body
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| snippet(&text));
    Err(HttpError::Status {
        status: status.as_u16(),
        message,
        body,
    })
}

/// `error.message` (or a string `error`) from the usual API error envelope.
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_reads_envelopes() {
        let body = json!({"error": {"message": "bad temperature", "param": "temperature"}});
        assert_eq!(error_message(&body).as_deref(), Some("bad temperature"));
        assert_eq!(
            error_message(&json!({"error": "quota exceeded"})).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(error_message(&json!({"detail": "x"})), None);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let long = "検".repeat(400);
        let cut = snippet(&long);
        assert!(cut.ends_with("...(truncated)"));
        assert!(cut.len() <= ERROR_BODY_LIMIT + "...(truncated)".len());
    }

    #[test]
    fn error_detail_only_for_json_status_errors() {
        let err = HttpError::Status {
            status: 400,
            message: "x".to_string(),
            body: Some(json!({"error": {"code": "unsupported_value"}})),
        };
        assert_eq!(
            err.error_detail().and_then(|detail| detail.get("code")),
            Some(&json!("unsupported_value"))
        );
        let err = HttpError::Status {
            status: 502,
            message: "bad gateway".to_string(),
            body: None,
        };
        assert!(err.error_detail().is_none());
    }
}
