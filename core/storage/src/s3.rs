//! S3 object store backed by opendal.

use async_trait::async_trait;
use bytes::Bytes;
use opendal::layers::TimeoutLayer;
use opendal::{ErrorKind, Operator};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

use crate::config::StoreConfig;
use crate::provider::{ObjectMetadata, ObjectStore};
use sluice_common::{Error, ObjectKey, Result, StorageClass};

/// Timeout for metadata requests (seconds).
pub const OP_TIMEOUT_SECS: u64 = 60;
/// Timeout for body transfer (seconds).
pub const IO_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
struct S3Settings {
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    endpoint: Option<String>,
}

/// S3 object store.
///
/// opendal attaches the storage class to the operator rather than to each
/// request, so one operator is built lazily per storage class and reused.
pub struct S3Store {
    settings: S3Settings,
    operators: RwLock<HashMap<StorageClass, Operator>>,
    name: String,
}

impl S3Store {
    /// Create an S3 store from a validated configuration.
    ///
    /// No request is sent until the first lookup or write.
    ///
    /// # Errors
    /// - Any identity field required by the s3 provider is missing
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let required = |field: &str, value: &Option<String>| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::config(field, "is missing"))
        };

        let settings = S3Settings {
            bucket: required("bucket", &config.bucket)?,
            region: required("region", &config.region)?,
            access_key_id: required("access_key_id", &config.access_key_id)?,
            secret_access_key: required("secret_access_key", &config.secret_access_key)?,
            endpoint: config.endpoint.clone(),
        };
        let name = format!("s3://{}", settings.bucket);

        let store = Self {
            settings,
            operators: RwLock::new(HashMap::new()),
            name,
        };
        // Fail on malformed settings now rather than on the first file
        store.operator(&StorageClass::default())?;
        Ok(store)
    }

    fn build_operator(&self, storage_class: &StorageClass) -> Result<Operator> {
        use opendal::services::S3;

        let settings = &self.settings;
        let mut builder = S3::default()
            .bucket(&settings.bucket)
            .region(&settings.region)
            .access_key_id(&settings.access_key_id)
            .secret_access_key(&settings.secret_access_key)
            .default_storage_class(storage_class.as_str());

        if let Some(ref ep) = settings.endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)
            .map_err(map_opendal_error)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Ok(operator)
    }

    fn operator(&self, storage_class: &StorageClass) -> Result<Operator> {
        if let Some(op) = self
            .operators
            .read()
            .map_err(|_| Error::Storage("operator cache poisoned".to_string()))?
            .get(storage_class)
        {
            return Ok(op.clone());
        }

        let op = self.build_operator(storage_class)?;
        debug!("Built S3 operator for {} ({})", self.name, storage_class);
        self.operators
            .write()
            .map_err(|_| Error::Storage("operator cache poisoned".to_string()))?
            .entry(storage_class.clone())
            .or_insert(op.clone());
        Ok(op)
    }

    fn check_key(key: &ObjectKey) -> Result<()> {
        if key.segments().next().is_none() {
            return Err(Error::InvalidInput(format!("Invalid object key: '{}'", key)));
        }
        Ok(())
    }
}

/// Map an opendal error onto the classified storage error domain.
pub(crate) fn map_opendal_error(e: opendal::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::NotFound(e.to_string()),
        ErrorKind::PermissionDenied => Error::Unauthorized(e.to_string()),
        ErrorKind::RateLimited => Error::Throttled(e.to_string()),
        ErrorKind::ConfigInvalid
        | ErrorKind::Unsupported
        | ErrorKind::IsADirectory
        | ErrorKind::NotADirectory => Error::InvalidInput(e.to_string()),
        _ if e.is_temporary() => Error::Network(e.to_string()),
        _ => Error::Storage(e.to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.name
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        Self::check_key(key)?;
        let operator = self.operator(&StorageClass::default())?;

        match operator.stat(key.as_str()).await {
            Ok(meta) => Ok(Some(ObjectMetadata {
                key: key.clone(),
                size: meta.content_length(),
                modified: meta.last_modified(),
                etag: meta.etag().map(|s| s.trim_matches('"').to_string()),
                storage_class: None,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_opendal_error(e)),
        }
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        storage_class: &StorageClass,
    ) -> Result<ObjectMetadata> {
        Self::check_key(key)?;
        let operator = self.operator(storage_class)?;
        let size = body.len() as u64;

        operator
            .write(key.as_str(), body)
            .await
            .map_err(map_opendal_error)?;

        Ok(ObjectMetadata {
            key: key.clone(),
            size,
            modified: None,
            etag: None,
            storage_class: Some(storage_class.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            bucket: Some("backups".into()),
            region: Some("us-east-1".into()),
            access_key_id: Some("AKIDEXAMPLE".into()),
            secret_access_key: Some("wJalrXUtnFEMI".into()),
            endpoint: Some("http://127.0.0.1:9000".into()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_new_does_not_touch_network() {
        let store = S3Store::new(&config()).unwrap();
        assert_eq!(store.name(), "s3://backups");
    }

    #[test]
    fn test_new_requires_identity() {
        let mut incomplete = config();
        incomplete.region = None;
        let err = S3Store::new(&incomplete).err().unwrap();
        assert!(matches!(err, Error::Config { ref field, .. } if field == "region"));
    }

    #[test]
    fn test_operator_cached_per_class() {
        let store = S3Store::new(&config()).unwrap();
        let glacier = StorageClass::new("GLACIER").unwrap();

        store.operator(&glacier).unwrap();
        store.operator(&glacier).unwrap();

        assert_eq!(store.operators.read().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_request() {
        let store = S3Store::new(&config()).unwrap();
        let err = store.head_object(&ObjectKey::new("//")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_error_mapping() {
        let throttled = map_opendal_error(opendal::Error::new(ErrorKind::RateLimited, "SlowDown"));
        assert!(matches!(throttled, Error::Throttled(_)));
        assert!(throttled.is_transient());

        let denied = map_opendal_error(opendal::Error::new(ErrorKind::PermissionDenied, "403"));
        assert!(matches!(denied, Error::Unauthorized(_)));
        assert!(!denied.is_transient());

        let flaky = map_opendal_error(
            opendal::Error::new(ErrorKind::Unexpected, "connection reset").set_temporary(),
        );
        assert!(matches!(flaky, Error::Network(_)));

        let broken = map_opendal_error(opendal::Error::new(ErrorKind::Unexpected, "500"));
        assert!(matches!(broken, Error::Storage(_)));
        assert!(!broken.is_transient());
    }
}
