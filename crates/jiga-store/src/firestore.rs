//! Firestore REST client.
//!
//! Only the two calls the seeding tools need are implemented: an atomic
//! `documents:commit` of full-document updates and a single-document read.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::{Document, DocumentStore, DocumentWrite, FieldValue, StoreError};

const HOSTED_BASE_URL: &str = "https://firestore.googleapis.com";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const EMULATOR_TOKEN: &str = "owner";
const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Build a key from environment-style values. Keys pasted into a single
    /// env line carry literal `\n` sequences instead of newlines.
    pub fn new(client_email: impl Into<String>, private_key: &str) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.replace("\\n", "\n"),
            token_uri: default_token_uri(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FirestoreEndpoint {
    Hosted(ServiceAccountKey),
    /// `host:port` of a local emulator; no token exchange happens.
    Emulator(String),
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub endpoint: FirestoreEndpoint,
    /// Replaces the hosted service root. Ignored for the emulator.
    pub base_url: Option<String>,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>, endpoint: FirestoreEndpoint) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    bearer: String,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl FirestoreStore {
    /// Open a session: build the HTTP client and, for the hosted service,
    /// exchange the service-account key for an access token.
    pub async fn connect(config: FirestoreConfig) -> Result<Self, StoreError> {
        if config.project_id.trim().is_empty() {
            return Err(StoreError::Configuration(
                "project id cannot be empty".into(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|err| StoreError::Configuration(err.to_string()))?;

        let (base_url, bearer) = match &config.endpoint {
            FirestoreEndpoint::Emulator(host) => {
                info!(host = %host, "Using Firestore emulator");
                (emulator_base_url(host), EMULATOR_TOKEN.to_string())
            }
            FirestoreEndpoint::Hosted(key) => {
                let token = fetch_access_token(&client, key).await?;
                let base_url = config
                    .base_url
                    .as_deref()
                    .unwrap_or(HOSTED_BASE_URL)
                    .trim_end_matches('/')
                    .to_string();
                (base_url, token)
            }
        };

        Ok(Self {
            client,
            base_url,
            project_id: config.project_id,
            bearer,
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, DEFAULT_DATABASE
        )
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }
}

fn emulator_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

async fn fetch_access_token(
    client: &Client,
    key: &ServiceAccountKey,
) -> Result<String, StoreError> {
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| StoreError::Auth(format!("invalid private key: {err}")))?;

    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + 3600,
    };
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|err| StoreError::Auth(format!("failed to sign assertion: {err}")))?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(StoreError::transport)?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Auth(format!(
            "token exchange returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response.json().await.map_err(StoreError::decode)?;
    debug!(client_email = %key.client_email, "Obtained Firestore access token");
    Ok(token.access_token)
}

async fn rejection(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    StoreError::Rejected { status, message }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        let body = json!({
            "writes": writes
                .iter()
                .map(|write| json!({
                    "update": {
                        "name": self.document_name(&write.collection, &write.id),
                        "fields": encode_fields(&write.fields),
                    }
                }))
                .collect::<Vec<_>>(),
        });

        let url = format!("{}/v1/{}:commit", self.base_url, self.documents_root());
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.bearer)
            .json(&body)
            .send()
            .await
            .map_err(StoreError::transport)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let url = format!("{}/v1/{}", self.base_url, self.document_name(collection, id));
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(StoreError::transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response.json().await.map_err(StoreError::decode)?;
        match body.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Some),
            // A stored document with no fields comes back without the key.
            _ => Ok(Some(Document::new())),
        }
    }
}

pub(crate) fn encode_fields(fields: &Document) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

pub(crate) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
        }
        FieldValue::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub(crate) fn decode_fields(fields: &Map<String, Value>) -> Result<Document, StoreError> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

pub(crate) fn decode_value(value: &Value) -> Result<FieldValue, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Err(StoreError::Decode(format!("not a typed value: {value}")));
    };

    let decoded = match kind.as_str() {
        "nullValue" => FieldValue::Null,
        "booleanValue" => FieldValue::Boolean(
            inner
                .as_bool()
                .ok_or_else(|| StoreError::Decode(format!("bad boolean: {inner}")))?,
        ),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            FieldValue::Integer(
                parsed.ok_or_else(|| StoreError::Decode(format!("bad integer: {inner}")))?,
            )
        }
        "doubleValue" => FieldValue::Double(
            inner
                .as_f64()
                .ok_or_else(|| StoreError::Decode(format!("bad double: {inner}")))?,
        ),
        "stringValue" => FieldValue::String(
            inner
                .as_str()
                .ok_or_else(|| StoreError::Decode(format!("bad string: {inner}")))?
                .to_string(),
        ),
        "timestampValue" => {
            let raw = inner
                .as_str()
                .ok_or_else(|| StoreError::Decode(format!("bad timestamp: {inner}")))?;
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(StoreError::decode)?;
            FieldValue::Timestamp(parsed.with_timezone(&Utc))
        }
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            FieldValue::Array(values)
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                _ => Document::new(),
            };
            FieldValue::Map(fields)
        }
        other => return Err(StoreError::Decode(format!("unsupported value type {other}"))),
    };
    Ok(decoded)
}
