//! Best-effort title generation through an external text-completion
//! endpoint. The issue store never depends on this; callers fall back to a
//! timestamp-derived title when no endpoint is configured or the call fails.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::IssuemakeConfig;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const TITLE_PROMPT: &str = r#"Generate a concise, descriptive issue title based on the following description.

IMPORTANT: Respond ONLY with valid JSON in this exact format:
{"title": "Your generated title here"}

Rules for the title:
- Keep it under 80 characters
- Use imperative mood (e.g., "Add", "Fix", "Update", "Implement")
- Be specific and actionable
- Do not include issue numbers or prefixes

Description:
{description}

Respond with JSON only:"#;

#[derive(Debug, Error)]
pub enum TitleGenError {
    #[error("No title-generation endpoint configured")]
    NotConfigured,
    #[error("Title request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse title response: {0}")]
    Parse(String),
    #[error("Endpoint returned an empty title")]
    EmptyTitle,
}

#[derive(Debug, Deserialize)]
struct TitlePayload {
    title: String,
}

/// Ask the configured endpoint for a title. Synchronous, bounded by a 30s
/// timeout at this boundary; the store imposes none of its own.
pub fn generate_title(
    config: &IssuemakeConfig,
    description: &str,
) -> Result<String, TitleGenError> {
    let endpoint = config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(TitleGenError::NotConfigured)?;
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let prompt = TITLE_PROMPT.replace("{description}", description);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    let mut request = client.post(endpoint).json(&json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
    }));
    if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        request = request.bearer_auth(key);
    }

    let response: serde_json::Value = request.send()?.error_for_status()?.json()?;
    let text = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| TitleGenError::Parse("missing message content".to_string()))?;
    parse_title_response(text)
}

/// Extract the `{"title": ...}` object from the completion text, tolerating
/// prose before or after it.
pub fn parse_title_response(response: &str) -> Result<String, TitleGenError> {
    let json_start = response.find('{');
    let json_end = response.rfind('}');
    match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => {
            let payload: TitlePayload = serde_json::from_str(&response[start..=end])
                .map_err(|err| TitleGenError::Parse(err.to_string()))?;
            let title = payload.title.trim().to_string();
            if title.is_empty() {
                return Err(TitleGenError::EmptyTitle);
            }
            Ok(title)
        }
        _ => Err(TitleGenError::Parse(
            "no JSON object found in response".to_string(),
        )),
    }
}

/// Title used when generation is unavailable.
pub fn fallback_title(now: DateTime<Local>) -> String {
    format!("task-{}", now.format("%Y%m%d-%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_accepts_plain_json() {
        let title = parse_title_response(r#"{"title": "Add user authentication"}"#).expect("parse");
        assert_eq!(title, "Add user authentication");
    }

    #[test]
    fn parse_tolerates_surrounding_prose() {
        let response = "Here you go:\n{\"title\": \"Fix login bug\"}\nHope that helps!";
        assert_eq!(parse_title_response(response).expect("parse"), "Fix login bug");
    }

    #[test]
    fn parse_trims_whitespace() {
        let title = parse_title_response(r#"{"title": "  Update dependencies  "}"#).expect("parse");
        assert_eq!(title, "Update dependencies");
    }

    #[test]
    fn parse_rejects_empty_title() {
        let err = parse_title_response(r#"{"title": "   "}"#);
        assert!(matches!(err, Err(TitleGenError::EmptyTitle)));
    }

    #[test]
    fn parse_rejects_text_without_json() {
        let err = parse_title_response("no json here");
        assert!(matches!(err, Err(TitleGenError::Parse(_))));
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let err = parse_title_response(r#"{"name": "wrong field"}"#);
        assert!(matches!(err, Err(TitleGenError::Parse(_))));
    }

    #[test]
    fn generate_requires_endpoint() {
        let err = generate_title(&IssuemakeConfig::default(), "desc");
        assert!(matches!(err, Err(TitleGenError::NotConfigured)));
    }

    #[test]
    fn fallback_title_is_timestamp_derived() {
        let now = Local::now();
        let title = fallback_title(now);
        assert!(title.starts_with("task-"));
        assert_eq!(title.len(), "task-YYYYMMDD-HHMM".len());
    }
}
