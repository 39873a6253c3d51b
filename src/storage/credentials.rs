use std::fmt;
use serde::Deserialize;
use crate::config::CredentialsSource;
use crate::error::{Error, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a service-account key file that the store needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| Error::CredentialsError(format!("malformed service account key: {}", e)))?;

        for (field, value) in [
            ("project_id", &key.project_id),
            ("client_email", &key.client_email),
            ("private_key", &key.private_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::CredentialsError(format!("service account key has empty {}", field)));
            }
        }

        Ok(key)
    }

    pub fn load(source: &CredentialsSource) -> Result<Self> {
        let json = match source {
            CredentialsSource::Env(var) => std::env::var(var)
                .map_err(|_| Error::CredentialsError(format!("environment variable {} is not set", var)))?,
            CredentialsSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::CredentialsError(format!("cannot read {}: {}", path.display(), e)))?,
        };

        Self::from_json(&json)
    }
}
