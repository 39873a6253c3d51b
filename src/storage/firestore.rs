use std::collections::BTreeMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use crate::error::{Error, Result};
use crate::interfaces::snapshot_store::SnapshotStore;
use crate::storage::credentials::ServiceAccountKey;
use crate::types::percent::Percent;
use crate::types::price::Price;
use crate::types::snapshot::IndexSnapshot;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const LIST_PAGE_SIZE: u32 = 300;

/// Snapshot store backed by a Firestore collection over the REST API.
///
/// One document per index name. A write is a full document replace, which
/// Firestore applies atomically.
pub struct FirestoreSnapshotStore {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    collection_url: Url,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    TOKEN_LIFETIME_SECS
}

#[derive(Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

impl FirestoreSnapshotStore {
    pub fn new(key: ServiceAccountKey, collection: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(key, collection, FIRESTORE_BASE_URL, timeout)
    }

    pub fn with_base_url(
        key: ServiceAccountKey,
        collection: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::CredentialsError(format!("invalid private key: {}", e)))?;

        let mut collection_url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("invalid Firestore URL {}: {}", base_url, e)))?;
        collection_url.path_segments_mut()
            .map_err(|_| Error::ConfigError(format!("Firestore URL cannot be a base: {}", base_url)))?
            .pop_if_empty()
            .extend(["projects", key.project_id.as_str(), "databases", "(default)", "documents", collection]);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(FirestoreSnapshotStore {
            client,
            key,
            encoding_key,
            collection_url,
            token: Mutex::new(None),
        })
    }

    fn document_url(&self, key: &str) -> Url {
        let mut url = self.collection_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(key);
        }
        url
    }

    /// Bearer token for the service account, reused until shortly before expiry.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::AuthenticationError(e.to_string()))?
            .as_secs();

        let claims = GrantClaims {
            iss: &self.key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::AuthenticationError(e.to_string()))?;

        // The JWT alphabet needs no form escaping.
        let body = format!(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer&assertion={}",
            assertion
        );

        let response = self.client
            .post(&self.key.token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::AuthenticationError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::AuthenticationError(format!(
                "token exchange failed: HTTP {}", response.status()
            )));
        }

        let token: TokenResponse = response.json()
            .await
            .map_err(|e| Error::AuthenticationError(e.to_string()))?;

        tracing::debug!("Obtained Firestore access token, expires in {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl SnapshotStore for FirestoreSnapshotStore {
    async fn upsert(&self, key: &str, snapshot: &IndexSnapshot) -> Result<()> {
        let write_error = |reason: String| Error::StoreWriteError {
            key: key.to_string(),
            reason,
        };

        let token = self.access_token().await?;
        let response = self.client
            .patch(self.document_url(key))
            .bearer_auth(token)
            .json(&json!({ "fields": encode_fields(snapshot) }))
            .send()
            .await
            .map_err(|e| write_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(write_error(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<IndexSnapshot>> {
        let token = self.access_token().await?;
        let response = self.client
            .get(self.document_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::StoreReadError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: Document = response.json()
                    .await
                    .map_err(|e| Error::StoreReadError(e.to_string()))?;
                decode_fields(&document.fields).map(Some)
            }
            status => Err(Error::StoreReadError(format!("{}: HTTP {}", key, status))),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, IndexSnapshot>> {
        let token = self.access_token().await?;
        let mut snapshots = BTreeMap::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.collection_url.clone();
            url.query_pairs_mut().append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
            if let Some(page) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", page);
            }

            let response = self.client
                .get(url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| Error::StoreReadError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(Error::StoreReadError(format!("list documents: HTTP {}", response.status())));
            }

            let page: ListDocumentsResponse = response.json()
                .await
                .map_err(|e| Error::StoreReadError(e.to_string()))?;

            for document in page.documents {
                let id = document.name.rsplit('/').next().unwrap_or_default().to_string();
                snapshots.insert(id, decode_fields(&document.fields)?);
            }

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(snapshots)
    }
}

fn encode_fields(snapshot: &IndexSnapshot) -> Value {
    fn number(value: Option<f64>) -> Value {
        match value {
            Some(v) => json!({ "doubleValue": v }),
            None => json!({ "nullValue": null }),
        }
    }

    json!({
        "current_price": number(snapshot.current_price.map(|p| p.to_f64())),
        "percent_change": number(snapshot.percent_change.map(|p| p.to_f64())),
        "previous_close": number(snapshot.previous_close.map(|p| p.to_f64())),
        "last_updated": match snapshot.last_updated {
            Some(t) => json!({ "timestampValue": t.to_rfc3339_opts(chrono::SecondsFormat::Micros, true) }),
            None => json!({ "nullValue": null }),
        },
    })
}

fn decode_number(fields: &Map<String, Value>, name: &str) -> Result<Option<f64>> {
    let Some(value) = fields.get(name) else {
        return Ok(None);
    };

    if let Some(v) = value.get("doubleValue").and_then(Value::as_f64) {
        return Ok(Some(v));
    }
    // Firestore renders 64-bit integers as strings
    if let Some(v) = value.get("integerValue") {
        let parsed = match v {
            Value::String(s) => s.parse::<i64>().ok(),
            other => other.as_i64(),
        };
        return parsed
            .map(|i| Some(i as f64))
            .ok_or_else(|| Error::StoreReadError(format!("field {} has malformed integerValue", name)));
    }
    if value.get("nullValue").is_some() {
        return Ok(None);
    }

    Err(Error::StoreReadError(format!("field {} has unexpected type: {}", name, value)))
}

fn decode_fields(fields: &Map<String, Value>) -> Result<IndexSnapshot> {
    let last_updated = match fields.get("last_updated").and_then(|v| v.get("timestampValue")) {
        Some(Value::String(s)) => Some(
            DateTime::parse_from_rfc3339(s)
                .map_err(|e| Error::StoreReadError(format!("last_updated: {}", e)))?
                .with_timezone(&Utc),
        ),
        _ => None,
    };

    Ok(IndexSnapshot {
        current_price: decode_number(fields, "current_price")?.map(Price::from_f64),
        percent_change: decode_number(fields, "percent_change")?.map(Percent::from_f64),
        previous_close: decode_number(fields, "previous_close")?.map(Price::from_f64),
        last_updated,
    })
}
