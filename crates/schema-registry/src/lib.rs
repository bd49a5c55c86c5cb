//! Schema registry client.
//!
//! Fetches Avro schemas from a Confluent-compatible schema registry:
//!
//! - `GET {registry}/subjects/{subject}/versions/latest` for the producer's
//!   value schema
//! - `GET {registry}/schemas/ids/{id}` for the writer schema of a received
//!   message
//!
//! Failures are fatal to the caller; the client never retries.

pub mod wire;

use std::time::Duration;

use apache_avro::rabin::Rabin;
use apache_avro::Schema;
use reqwest::Client;
use serde::Deserialize;

/// Errors that can occur while fetching a schema.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Schema registry request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Schema registry returned status {status} for '{url}'")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed schema registry response from '{url}': {reason}")]
    MalformedBody { url: String, reason: String },

    #[error("Unsupported schema type '{0}', only AVRO is supported")]
    UnsupportedSchemaType(String),

    #[error("Invalid Avro schema for subject '{subject}': {source}")]
    InvalidSchema {
        subject: String,
        #[source]
        source: apache_avro::Error,
    },
}

/// The registry subject holding a topic's value schema.
pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}

/// A schema fetched from the registry, parsed once.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    subject: String,
    id: Option<u32>,
    version: Option<i32>,
    text: String,
    schema: Schema,
}

impl SchemaDocument {
    /// Parse schema text into a document.
    pub fn new(
        subject: impl Into<String>,
        text: impl Into<String>,
        id: Option<u32>,
        version: Option<i32>,
    ) -> Result<Self, RegistryError> {
        let subject = subject.into();
        let text = text.into();
        let schema = Schema::parse_str(&text).map_err(|source| RegistryError::InvalidSchema {
            subject: subject.clone(),
            source,
        })?;
        Ok(Self {
            subject,
            id,
            version,
            text,
            schema,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Registry-assigned schema id, used in the wire framing.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    /// The schema text as returned by the registry.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Hex Rabin fingerprint of the schema's canonical form.
    pub fn fingerprint(&self) -> String {
        self.schema.fingerprint::<Rabin>().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    schema: String,
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    version: Option<i32>,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
}

/// Parse a registry response body into a document.
pub fn parse_schema_response(
    subject: &str,
    url: &str,
    body: &str,
) -> Result<SchemaDocument, RegistryError> {
    let response: SchemaResponse =
        serde_json::from_str(body).map_err(|e| RegistryError::MalformedBody {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(schema_type) = response.schema_type {
        if !schema_type.eq_ignore_ascii_case("AVRO") {
            return Err(RegistryError::UnsupportedSchemaType(schema_type));
        }
    }

    SchemaDocument::new(subject, response.schema, response.id, response.version)
}

/// HTTP client for a schema registry.
#[derive(Debug, Clone)]
pub struct SchemaRegistryClient {
    base_url: String,
    http: Client,
}

impl SchemaRegistryClient {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| RegistryError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the latest schema registered under `subject`.
    pub async fn fetch_latest(&self, subject: &str) -> Result<SchemaDocument, RegistryError> {
        let url = format!("{}/subjects/{subject}/versions/latest", self.base_url);
        tracing::info!("Fetching schema from {url}");

        let body = self.get(&url).await?;
        let document = parse_schema_response(subject, &url, &body)?;

        tracing::debug!(
            "Fetched schema for '{}' (id: {:?}, version: {:?}, fingerprint: {})",
            subject,
            document.id(),
            document.version(),
            document.fingerprint()
        );
        Ok(document)
    }

    /// Fetch the latest value schema of a topic.
    pub async fn fetch_topic_value_schema(
        &self,
        topic: &str,
    ) -> Result<SchemaDocument, RegistryError> {
        self.fetch_latest(&value_subject(topic)).await
    }

    /// Fetch a schema by its registry id.
    pub async fn fetch_by_id(&self, id: u32) -> Result<SchemaDocument, RegistryError> {
        let url = format!("{}/schemas/ids/{id}", self.base_url);
        tracing::debug!("Fetching schema id {id} from {url}");

        let body = self.get(&url).await?;
        let mut document = parse_schema_response(&format!("id:{id}"), &url, &body)?;
        document.id = Some(id);
        Ok(document)
    }

    async fn get(&self, url: &str) -> Result<String, RegistryError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.schemaregistry.v1+json")
            .send()
            .await
            .map_err(|source| RegistryError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response.text().await.map_err(|source| RegistryError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SCHEMA: &str =
        r#"{"type":"record","name":"Ping","fields":[{"name":"Id","type":"string"}]}"#;

    fn latest_body() -> String {
        serde_json::json!({
            "subject": "pings-value",
            "version": 3,
            "id": 17,
            "schema": SCHEMA
        })
        .to_string()
    }

    /// Serve a single canned HTTP response and report the request line.
    async fn serve_once(
        status: &str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn test_value_subject() {
        assert_eq!(value_subject("payments"), "payments-value");
    }

    #[test]
    fn test_parse_schema_response() {
        let document = parse_schema_response("pings-value", "u", &latest_body()).unwrap();
        assert_eq!(document.subject(), "pings-value");
        assert_eq!(document.id(), Some(17));
        assert_eq!(document.version(), Some(3));
        assert_eq!(document.text(), SCHEMA);
        assert!(matches!(document.schema(), Schema::Record(_)));
    }

    #[test]
    fn test_parse_missing_schema_field() {
        let result = parse_schema_response("s", "u", r#"{"id": 1}"#);
        assert!(matches!(result, Err(RegistryError::MalformedBody { .. })));
    }

    #[test]
    fn test_parse_not_json() {
        let result = parse_schema_response("s", "u", "<html>oops</html>");
        assert!(matches!(result, Err(RegistryError::MalformedBody { .. })));
    }

    #[test]
    fn test_parse_protobuf_rejected() {
        let body = r#"{"schema": "syntax = \"proto3\";", "schemaType": "PROTOBUF"}"#;
        let result = parse_schema_response("s", "u", body);
        assert!(matches!(result, Err(RegistryError::UnsupportedSchemaType(_))));
    }

    #[test]
    fn test_parse_invalid_avro() {
        let result = parse_schema_response("s", "u", r#"{"schema": "{\"type\": \"nope\"}"}"#);
        assert!(matches!(result, Err(RegistryError::InvalidSchema { .. })));
    }

    #[test]
    fn test_fingerprint_is_stable_across_formatting() {
        let compact = SchemaDocument::new("s", SCHEMA, None, None).unwrap();
        let spaced = SchemaDocument::new(
            "s",
            r#"{ "type": "record", "name": "Ping",
                 "fields": [ { "name": "Id", "type": "string" } ] }"#,
            None,
            None,
        )
        .unwrap();
        let other = SchemaDocument::new(
            "s",
            r#"{"type":"record","name":"Ping","fields":[{"name":"Id","type":"long"}]}"#,
            None,
            None,
        )
        .unwrap();

        assert_eq!(compact.fingerprint(), spaced.fingerprint());
        assert_ne!(compact.fingerprint(), other.fingerprint());
    }

    #[tokio::test]
    async fn test_fetch_latest() {
        let (url, server) = serve_once("200 OK", latest_body()).await;
        let client = SchemaRegistryClient::new(&format!("{url}/")).unwrap();

        let document = client.fetch_topic_value_schema("pings").await.unwrap();
        assert_eq!(document.id(), Some(17));

        let request_line = server.await.unwrap();
        assert_eq!(
            request_line,
            "GET /subjects/pings-value/versions/latest HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let body = serde_json::json!({ "schema": SCHEMA }).to_string();
        let (url, server) = serve_once("200 OK", body).await;
        let client = SchemaRegistryClient::new(&url).unwrap();

        let document = client.fetch_by_id(42).await.unwrap();
        assert_eq!(document.id(), Some(42));
        assert_eq!(server.await.unwrap(), "GET /schemas/ids/42 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let body = r#"{"error_code":40401,"message":"Subject not found."}"#.to_string();
        let (url, server) = serve_once("404 Not Found", body).await;
        let client = SchemaRegistryClient::new(&url).unwrap();

        let result = client.fetch_latest("missing-value").await;
        assert!(matches!(
            result,
            Err(RegistryError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_unreachable_registry() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SchemaRegistryClient::new(&format!("http://{addr}")).unwrap();
        let result = client.fetch_latest("x-value").await;
        assert!(matches!(result, Err(RegistryError::Http { .. })));
    }
}
