//! Store identity configuration and validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use sluice_common::{Error, Result};

/// Environment variable consulted for the access key id.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable consulted for the secret access key.
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable consulted for the region.
pub const ENV_REGION: &str = "AWS_DEFAULT_REGION";
/// Environment variable consulted for the bucket name.
pub const ENV_BUCKET: &str = "SLUICE_BUCKET";
/// Environment variable consulted for a custom endpoint.
pub const ENV_ENDPOINT: &str = "SLUICE_ENDPOINT";

/// Which bucket to talk to and how to authenticate.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Registered provider name ("s3", "local", "memory").
    pub provider: String,
    /// Bucket name.
    pub bucket: Option<String>,
    /// Region of the bucket.
    pub region: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    /// Root directory for the local provider.
    pub root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: "s3".to_string(),
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            root: None,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("provider", &self.provider)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint", &self.endpoint)
            .field("root", &self.root)
            .finish()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl StoreConfig {
    /// Fill unset identity fields from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|name| std::env::var(name).ok())
    }

    /// Fill unset identity fields from `lookup`, keyed by environment variable name.
    ///
    /// Values already present in the configuration win.
    pub fn with_fallback<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, name: &str| {
            if is_blank(slot) {
                if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        };

        fill(&mut self.access_key_id, ENV_ACCESS_KEY_ID);
        fill(&mut self.secret_access_key, ENV_SECRET_ACCESS_KEY);
        fill(&mut self.region, ENV_REGION);
        fill(&mut self.bucket, ENV_BUCKET);
        fill(&mut self.endpoint, ENV_ENDPOINT);
        self
    }

    /// Check that every field the chosen provider needs is present.
    ///
    /// # Errors
    /// - `Error::Config` naming the first missing field
    pub fn validate(&self) -> Result<()> {
        match self.provider.as_str() {
            "s3" => {
                let required = [
                    ("access_key_id", &self.access_key_id),
                    ("secret_access_key", &self.secret_access_key),
                    ("region", &self.region),
                    ("bucket", &self.bucket),
                ];
                for (field, value) in required {
                    if is_blank(value) {
                        return Err(Error::config(field, "is missing"));
                    }
                }
                Ok(())
            }
            "local" => match &self.root {
                Some(root) if !root.as_os_str().is_empty() => Ok(()),
                _ => Err(Error::config("root", "is missing")),
            },
            "memory" => Ok(()),
            other => Err(Error::config(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }

    /// Human-readable bucket label for logs.
    pub fn bucket_label(&self) -> String {
        match self.provider.as_str() {
            "local" => self
                .root
                .as_ref()
                .map(|r| format!("local://{}", r.display()))
                .unwrap_or_else(|| "local://".to_string()),
            "memory" => "memory://".to_string(),
            provider => format!(
                "{}://{}",
                provider,
                self.bucket.as_deref().unwrap_or_default()
            ),
        }
    }
}
