//! Provider payload construction and response parsing.
//!
//! Requests use the chat-completions shape. Responses are parsed
//! tolerantly: both `choices[0].message.content` and the messages-API
//! `content[0].text` are accepted, and model output wrapped in markdown
//! code fences is unwrapped before JSON parsing.

use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use crate::error::{ExtractionError, Result};
use crate::metrics::TokenUsage;
use crate::pipeline::prompts::{format_extract_prompt, format_user_prompt};
use crate::types::config::{AuthScheme, ProviderConfig};
use crate::types::schema::SchemaSpec;

/// Build the request headers for a provider.
///
/// Authenticated schemes fail with a configuration error when no API key
/// was loaded, rather than sending an unauthenticated request.
pub(crate) fn build_headers(config: &ProviderConfig) -> Result<Vec<(String, String)>> {
    let mut headers: Vec<(String, String)> = config.extra_headers.clone();

    match &config.auth {
        AuthScheme::None => {}
        AuthScheme::Bearer => {
            let key = expose_key(config)?;
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }
        AuthScheme::Header { name } => {
            let key = expose_key(config)?;
            headers.push((name.clone(), key));
        }
    }

    Ok(headers)
}

fn expose_key(config: &ProviderConfig) -> Result<String> {
    config
        .api_key
        .as_ref()
        .map(|key| key.expose_secret().to_string())
        .ok_or_else(|| {
            ExtractionError::configuration(format!(
                "no API key configured for provider `{}`",
                config.name
            ))
        })
}

/// Build the JSON request body for one extraction call.
pub(crate) fn build_payload(
    config: &ProviderConfig,
    model: &str,
    instruction: &str,
    schema: &SchemaSpec,
    source: &str,
    content: &str,
) -> Value {
    let mut payload = serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": format_extract_prompt(instruction, &schema.describe()),
            },
            {
                "role": "user",
                "content": format_user_prompt(source, content),
            },
        ],
        "temperature": 0.0,
    });

    if config.supports_json_mode {
        payload["response_format"] = serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": "extraction",
                "strict": false,
                "schema": schema.json_schema(),
            },
        });
    }

    payload
}

/// Structured view of a provider response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    /// The model's output parsed as a JSON object
    pub fields: Map<String, Value>,

    /// Token usage when the provider reported it
    pub usage: Option<TokenUsage>,
}

/// Parse a raw provider response body into field values.
///
/// Fails with [`ExtractionError::Parsing`] when the body is not JSON, has
/// no message content, or the content is not a JSON object.
pub fn parse_response(body: &str) -> Result<ParsedResponse> {
    let envelope: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::parsing(format!("response body is not JSON: {e}")))?;

    let content = envelope["choices"][0]["message"]["content"]
        .as_str()
        .or_else(|| envelope["content"][0]["text"].as_str())
        .ok_or_else(|| ExtractionError::parsing("response carries no message content"))?;

    let usage = parse_usage(&envelope["usage"]);

    let stripped = strip_code_fences(content);
    let parsed: Value = serde_json::from_str(stripped)
        .map_err(|e| ExtractionError::parsing(format!("message content is not JSON: {e}")))?;

    let fields = parsed
        .as_object()
        .cloned()
        .ok_or_else(|| ExtractionError::parsing("message content is not a JSON object"))?;

    Ok(ParsedResponse { fields, usage })
}

fn parse_usage(usage: &Value) -> Option<TokenUsage> {
    let prompt = usage
        .get("prompt_tokens")
        .or_else(|| usage.get("input_tokens"))?
        .as_u64()?;
    let completion = usage
        .get("completion_tokens")
        .or_else(|| usage.get("output_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Some(TokenUsage {
        prompt_tokens: prompt as u32,
        completion_tokens: completion as u32,
    })
}

/// Unwrap model output fenced as a markdown code block.
fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::FieldSpec;

    fn config() -> ProviderConfig {
        ProviderConfig::new("acme", "https://api.acme.dev/v1/chat", "acme-small")
            .with_api_key("sk-test")
    }

    #[test]
    fn test_bearer_headers() {
        let headers = build_headers(&config()).unwrap();
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer sk-test"));
    }

    #[test]
    fn test_named_header_and_extras() {
        let config = config()
            .with_auth(AuthScheme::Header {
                name: "x-api-key".into(),
            })
            .with_header("api-version", "2024-01-01");

        let headers = build_headers(&config).unwrap();
        assert!(headers.iter().any(|(k, v)| k == "x-api-key" && v == "sk-test"));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "api-version" && v == "2024-01-01"));
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = ProviderConfig::new("acme", "https://api.acme.dev", "m");
        let err = build_headers(&config).unwrap_err();
        assert!(matches!(err, ExtractionError::Configuration { .. }));
        assert!(err.to_string().contains("acme"));
    }

    #[test]
    fn test_no_auth_sends_only_extras() {
        let config = ProviderConfig::new("local", "http://localhost:1234", "m")
            .with_auth(AuthScheme::None);
        assert!(build_headers(&config).unwrap().is_empty());
    }

    #[test]
    fn test_payload_shape() {
        let schema = SchemaSpec::new().field("price", FieldSpec::number().required());
        let payload = build_payload(
            &config(),
            "acme-small",
            "Extract the price",
            &schema,
            "https://example.com",
            "Widget costs $19.99",
        );

        assert_eq!(payload["model"], "acme-small");
        assert_eq!(payload["temperature"], 0.0);
        assert_eq!(payload["messages"][0]["role"], "system");
        let system = payload["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Extract the price"));
        assert!(system.contains("price (number)"));
        let user = payload["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("https://example.com"));
        assert!(user.contains("Widget costs $19.99"));
        assert!(payload.get("response_format").is_none());
    }

    #[test]
    fn test_payload_json_mode() {
        let schema = SchemaSpec::new().field("price", FieldSpec::number().required());
        let payload = build_payload(
            &config().with_json_mode(true),
            "m",
            "",
            &schema,
            "src",
            "content",
        );

        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(
            payload["response_format"]["json_schema"]["schema"]["properties"]["price"]["type"],
            "number"
        );
    }

    #[test]
    fn test_parse_chat_completions_shape() {
        let body = r#"{
            "choices": [{"message": {"content": "{\"price\": 19.99}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 8}
        }"#;

        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.fields["price"], 19.99);
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.completion_tokens, 8);
    }

    #[test]
    fn test_parse_messages_api_shape() {
        let body = r#"{
            "content": [{"type": "text", "text": "{\"price\": 5}"}],
            "usage": {"input_tokens": 40, "output_tokens": 4}
        }"#;

        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.fields["price"], 5);
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 40);
    }

    #[test]
    fn test_parse_tolerates_code_fences() {
        let body = serde_json::json!({
            "choices": [{"message": {"content": "```json\n{\"name\": \"Widget\"}\n```"}}]
        })
        .to_string();

        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed.fields["name"], "Widget");
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_parse_rejects_non_json_body() {
        let err = parse_response("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ExtractionError::Parsing { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_content() {
        let err = parse_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Parsing { .. }));
    }

    #[test]
    fn test_parse_rejects_non_object_content() {
        let body = r#"{"choices": [{"message": {"content": "[1, 2, 3]"}}]}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, ExtractionError::Parsing { .. }));
    }
}
