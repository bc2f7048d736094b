//! Object storage clients

use crate::config::StorageConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Environment variable holding an OAuth bearer token for Cloud Storage
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Source of the raw dataset object
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Copy `bucket/object` to `dest`, returning the number of bytes written
    async fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64>;
}

/// Cloud Storage JSON API client
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl GcsStore {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PipelineError::Config(format!("invalid storage endpoint {}: {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(PipelineError::Config(format!("storage endpoint {} cannot be a base URL", endpoint)));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token: None,
        })
    }

    /// Client authenticated with the token from `GOOGLE_OAUTH_ACCESS_TOKEN`, if set
    pub fn from_env(endpoint: &str) -> Result<Self> {
        let store = Self::new(endpoint)?;
        Ok(match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => store.with_token(token),
            _ => store,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Media download URL; bucket and object are percent-encoded as single segments
    pub fn object_url(&self, bucket: &str, object: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", bucket, "o", object]);
        }
        url.query_pairs_mut().append_pair("alt", "media");
        url
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64> {
        let url = self.object_url(bucket, object);
        debug!(url = %url, "Requesting object");

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Storage(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let body = response.bytes().await?;
        tokio::fs::write(dest, &body).await?;
        info!(bucket, object, bytes = body.len(), "Downloaded object");
        Ok(body.len() as u64)
    }
}

/// Directory standing in for a bucket store, laid out as `{root}/{bucket}/{object}`
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<u64> {
        let source = self.root.join(bucket).join(object);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(PipelineError::Storage(format!(
                "object {}/{} not found under {}",
                bucket,
                object,
                self.root.display()
            )));
        }
        let bytes = tokio::fs::copy(&source, dest).await?;
        info!(source = %source.display(), bytes, "Copied object");
        Ok(bytes)
    }
}

/// Build the store selected by configuration
pub fn store_from_config(config: &StorageConfig) -> Result<Box<dyn ObjectStore>> {
    Ok(match config {
        StorageConfig::Gcs { endpoint } => Box::new(GcsStore::from_env(endpoint)?),
        StorageConfig::Local { root } => Box::new(LocalStore::new(root.clone())),
    })
}
