//! Shared configuration types for object-store clients.

use minfs_common::{ENV_ACCESS_KEY, ENV_SECRET_KEY, ENV_SECRET_TOKEN};

/// Static credentials for the object store.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment.
    ///
    /// Reads `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY` and the optional
    /// `MINFS_SECRET_TOKEN`. Returns `None` when the key pair is not set,
    /// in which case backends fall through to their default provider chain.
    pub fn from_env() -> Option<Self> {
        let access_key: String = std::env::var(ENV_ACCESS_KEY).ok()?;
        let secret_key: String = std::env::var(ENV_SECRET_KEY).ok()?;
        Some(Self {
            access_key,
            secret_key,
            session_token: std::env::var(ENV_SECRET_TOKEN).ok(),
        })
    }
}

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Endpoint URL, e.g. `https://play.min.io:9000`.
    pub endpoint: String,
    /// Region to sign with. S3-compatible stores generally accept anything.
    pub region: String,
    /// Static credentials; `None` uses the backend's default chain.
    pub credentials: Option<Credentials>,
    /// Disable TLS certificate verification.
    pub insecure: bool,
}

impl StorageSettings {
    /// Create settings for an endpoint with credentials from the environment.
    ///
    /// # Arguments
    /// * `endpoint` - Endpoint URL including scheme and optional port
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: "us-east-1".into(),
            credentials: Credentials::from_env(),
            insecure: false,
        }
    }

    /// Set the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Disable TLS certificate verification.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}
