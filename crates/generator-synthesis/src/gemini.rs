//! Gemini-backed synthesizer and verifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schema_registry::SchemaDocument;
use serde::{Deserialize, Serialize};

use crate::backend::{Synthesizer, VerificationResult, Verifier};
use crate::error::SynthesisError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the Gemini backend, built once at startup.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

// Hand-written so the key never ends up in logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

const PLAN_FORMAT: &str = r#"
The generator is a YAML document with this shape:

record: <name of the top-level Avro record>
fields:
  - name: <Avro field name, one entry per schema field, in schema order>
    null_probability: <optional, 0.0-1.0, only for fields whose type is a union with "null">
    generator: <one generator object>

Available generator objects (the `type` key selects one):
  { type: uuid_v4 }                                  hyphenated UUID v4 string
  { type: hex, length: N }                           lowercase hex string of N characters
  { type: digits, length: N }                        string of N decimal digits
  { type: pattern, pattern: "CUST{rand:8}" }         string with {uuid}, {rand:N}, {hex:N} placeholders
  { type: int_range, min: A, max: B }                integer in [A, B]
  { type: float_range, min: A, max: B }              float in [A, B]
  { type: minor_units_formatted, source: F, decimals: 2 }
                                                     decimal string of the earlier integer sibling F divided by 10^decimals
  { type: timestamp_now, unit: iso8601 | millis | micros }
  { type: weighted_bool, true_weight: P }
  { type: one_of, values: [v1, v2, ...] }            pick one value (enum fields must list valid symbols)
  { type: static, value: V }
  { type: "null" }
  { type: record, fields: [ ...same field list shape... ] }
  { type: array, items: <generator>, min_length: A, max_length: B }

When one field is a formatted rendering of another (for example an amount in
minor units and its decimal string), generate the integer first and derive the
string with minor_units_formatted so both agree.
"#;

/// Prompt asking the backend for a generator plan.
pub fn synthesis_prompt(schema_text: &str) -> String {
    format!(
        r#"You are an expert test data engineer. Your task is to write a generator plan that produces random data conforming to the provided Avro schema.
**Instructions:**
1. The plan must describe a generator named `generate_event` for the schema's top-level record.
2. It takes no inputs.
3. Every event it produces must strictly match the structure and data types defined in the Avro schema.
4. Your response MUST be only the raw YAML plan. Do not include any markdown formatting (like ```yaml), explanations, or any text outside of the plan.
{PLAN_FORMAT}
**Avro Schema:**
{schema_text}
"#
    )
}

/// Prompt asking the backend to judge a candidate plan.
pub fn verification_prompt(candidate: &str, schema_text: &str) -> String {
    format!(
        r#"You are an expert Avro schema and test data generator validator. Analyze the generator plan below and determine whether every event it produces conforms to the Avro schema.
Respond with only the single word "yes" if it conforms, or "no" followed by a short reason if it does not.
{PLAN_FORMAT}
**Avro Schema:**
```json
{schema_text}
```
**Generator Plan:**
```yaml
{candidate}
```
Does the generator plan produce data that conforms to the Avro schema? Your answer:
"#
    )
}

/// Remove a surrounding markdown code fence, if the backend added one anyway.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the info string (e.g. "yaml") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, SynthesisError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send a single-turn prompt and return the response text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, SynthesisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SynthesisError::MissingCredential)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status { status, body });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.text().ok_or(SynthesisError::EmptyResponse)
    }
}

#[async_trait]
impl Synthesizer for GeminiClient {
    async fn synthesize(&self, schema: &SchemaDocument) -> Result<String, SynthesisError> {
        tracing::info!(
            "Generating data creation plan from schema with {}",
            self.config.model
        );
        let text = self.generate_content(&synthesis_prompt(schema.text())).await?;
        let candidate = strip_code_fences(&text);
        if candidate.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(candidate)
    }
}

#[async_trait]
impl Verifier for GeminiClient {
    async fn verify(
        &self,
        candidate: &str,
        schema: &SchemaDocument,
    ) -> Result<VerificationResult, SynthesisError> {
        tracing::info!("Verifying generated plan against schema");
        let text = self
            .generate_content(&verification_prompt(candidate, schema.text()))
            .await?;
        Ok(VerificationResult::from_response(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SCHEMA: &str =
        r#"{"type":"record","name":"Ping","fields":[{"name":"Id","type":"string"}]}"#;

    fn schema() -> SchemaDocument {
        SchemaDocument::new("pings-value", SCHEMA, Some(1), Some(1)).unwrap()
    }

    fn reply(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    /// Serve one canned response and hand back the raw request.
    async fn serve_once(status: &str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = vec![0u8; 8192];
            // Read until the declared body has arrived
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn config(endpoint: String) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            endpoint,
            ..Default::default()
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("record: A\n"), "record: A");
        assert_eq!(strip_code_fences("```yaml\nrecord: A\n```"), "record: A");
        assert_eq!(strip_code_fences("```\nrecord: A\n```\n"), "record: A");
        assert_eq!(strip_code_fences("  ```yaml\nrecord: A"), "record: A");
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let prompt = synthesis_prompt(SCHEMA);
        assert!(prompt.contains("generate_event"));
        assert!(prompt.contains(SCHEMA));
        assert!(prompt.contains("minor_units_formatted"));

        let prompt = verification_prompt("record: Ping", SCHEMA);
        assert!(prompt.contains("record: Ping"));
        assert!(prompt.contains(SCHEMA));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = config("http://localhost".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"ye"},{"text":"s"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("yes"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let result = client.synthesize(&schema()).await;
        assert!(matches!(result, Err(SynthesisError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_synthesize_request_and_response() {
        let (url, server) = serve_once("200 OK", reply("```yaml\nrecord: Ping\n```")).await;
        let client = GeminiClient::new(config(url)).unwrap();

        let candidate = client.synthesize(&schema()).await.unwrap();
        assert_eq!(candidate, "record: Ping");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-pro:generateContent HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains("\"contents\""));
    }

    #[tokio::test]
    async fn test_verify_normalizes_verdict() {
        let (url, server) = serve_once("200 OK", reply(" Yes \n")).await;
        let client = GeminiClient::new(config(url)).unwrap();

        let result = client.verify("record: Ping", &schema()).await.unwrap();
        assert!(result.accepted);
        assert_eq!(result.raw_response, "yes");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_error_status() {
        let (url, server) =
            serve_once("403 Forbidden", r#"{"error":{"message":"denied"}}"#.to_string()).await;
        let client = GeminiClient::new(config(url)).unwrap();

        let result = client.synthesize(&schema()).await;
        assert!(matches!(result, Err(SynthesisError::Status { .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_backend_response() {
        let (url, server) = serve_once("200 OK", r#"{"candidates":[]}"#.to_string()).await;
        let client = GeminiClient::new(config(url)).unwrap();

        let result = client.synthesize(&schema()).await;
        assert!(matches!(result, Err(SynthesisError::EmptyResponse)));
        server.await.unwrap();
    }
}
