//! AWS SDK S3 client implementation.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use minfs_storage::{BucketInfo, ObjectClient, ObjectInfo, StorageError, StorageSettings};

/// Suffix for in-flight downloads; the finished file is renamed into place.
const PARTIAL_SUFFIX: &str = ".partial";

/// ObjectClient implementation using the AWS SDK for Rust.
///
/// Works against any S3-compatible store: the endpoint comes from the mount
/// target URL and requests use path-style addressing, which MinIO and
/// friends expect.
pub struct S3ObjectClient {
    /// The underlying S3 client.
    s3_client: S3Client,
}

impl S3ObjectClient {
    /// Create a new client for the given endpoint.
    ///
    /// Static credentials from `settings` take precedence; otherwise the
    /// SDK's default provider chain applies.
    ///
    /// # Arguments
    /// * `settings` - Endpoint, region and credential configuration
    pub async fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        if settings.endpoint.is_empty() {
            return Err(StorageError::InvalidConfig {
                message: "endpoint not set".into(),
            });
        }

        let config_loader = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(&settings.endpoint)
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()));

        let config_loader = if let Some(ref creds) = settings.credentials {
            let credentials = Credentials::new(
                &creds.access_key,
                &creds.secret_key,
                creds.session_token.clone(),
                None,
                "minfs",
            );
            config_loader.credentials_provider(credentials)
        } else {
            config_loader
        };

        if settings.insecure {
            // The SDK's default TLS stack does not expose a verification
            // toggle; the flag is accepted for mount-option compatibility.
            tracing::warn!("insecure option set; TLS verification cannot be relaxed, continuing");
        }

        let sdk_config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            s3_client: S3Client::from_conf(s3_config),
        })
    }

    /// Create a client from an existing S3Client (for testing).
    pub fn from_client(s3_client: S3Client) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        let response = self
            .s3_client
            .list_buckets()
            .send()
            .await
            .map_err(|err| StorageError::NetworkError {
                message: err.to_string(),
                retryable: true,
            })?;

        let buckets: Vec<BucketInfo> = response
            .buckets()
            .iter()
            .filter_map(|b| {
                b.name().map(|name| BucketInfo {
                    name: name.to_string(),
                    creation_date: b.creation_date().and_then(datetime_to_system_time),
                })
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects: Vec<ObjectInfo> = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .s3_client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);

            if !recursive {
                request = request.delimiter("/");
            }

            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response =
                request
                    .send()
                    .await
                    .map_err(|err| StorageError::NetworkError {
                        message: err.to_string(),
                        retryable: true,
                    })?;

            // Common prefixes are the store's synthetic directory entries;
            // surface them with a trailing slash and no etag.
            for cp in response.common_prefixes() {
                if let Some(key) = cp.prefix() {
                    objects.push(ObjectInfo {
                        key: key.to_string(),
                        size: 0,
                        etag: String::new(),
                        last_modified: None,
                    });
                }
            }

            for obj in response.contents() {
                objects.push(ObjectInfo {
                    key: obj.key().unwrap_or_default().to_string(),
                    size: obj.size().map(|s| s as u64).unwrap_or(0),
                    etag: trim_etag(obj.e_tag()),
                    last_modified: obj.last_modified().and_then(datetime_to_system_time),
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token.clone();
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn stat_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectInfo>, StorageError> {
        let request = self.s3_client.head_object().bucket(bucket).key(key);

        match request.send().await {
            Ok(output) => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: output.content_length().map(|l| l as u64).unwrap_or(0),
                etag: trim_etag(output.e_tag()),
                last_modified: output.last_modified().and_then(datetime_to_system_time),
            })),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: false,
                    })
                }
            }
        }
    }

    async fn fetch_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let request = self.s3_client.get_object().bucket(bucket).key(key);

        let response = request.send().await.map_err(|err| {
            let service_err = err.into_service_error();
            if service_err.is_no_such_key() {
                StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::NetworkError {
                    message: service_err.to_string(),
                    retryable: true,
                }
            }
        })?;

        // Create parent directories if needed
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::IoError {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
        }

        // Stream into a sibling partial file, then rename into place so the
        // destination only ever holds complete contents.
        let partial_path: PathBuf = partial_path_for(local_path);

        let mut file = File::create(&partial_path)
            .await
            .map_err(|e| StorageError::IoError {
                path: partial_path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut body = response.body;
        while let Some(chunk) =
            body.try_next()
                .await
                .map_err(|e| StorageError::NetworkError {
                    message: e.to_string(),
                    retryable: true,
                })?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::IoError {
                    path: partial_path.display().to_string(),
                    message: e.to_string(),
                })?;
        }

        file.flush().await.map_err(|e| StorageError::IoError {
            path: partial_path.display().to_string(),
            message: e.to_string(),
        })?;
        drop(file);

        tokio::fs::rename(&partial_path, local_path)
            .await
            .map_err(|e| StorageError::IoError {
                path: local_path.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

/// Strip the quotes the wire format wraps around etags.
fn trim_etag(etag: Option<&str>) -> String {
    etag.unwrap_or_default().trim_matches('"').to_string()
}

fn partial_path_for(local_path: &Path) -> PathBuf {
    let mut name = local_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn datetime_to_system_time(dt: &aws_sdk_s3::primitives::DateTime) -> Option<SystemTime> {
    let millis: i64 = dt.to_millis().ok()?;
    if millis < 0 {
        return None;
    }
    Some(UNIX_EPOCH + Duration::from_millis(millis as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_client_impl() {
        // Compile-time check that the trait is implemented correctly
        fn assert_object_client<T: ObjectClient>() {}
        assert_object_client::<S3ObjectClient>();
    }

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag(Some("\"abc123\"")), "abc123");
        assert_eq!(trim_etag(Some("abc123-2")), "abc123-2");
        assert_eq!(trim_etag(None), "");
    }

    #[test]
    fn test_partial_path() {
        let p: PathBuf = partial_path_for(Path::new("/cache/b/a-e1.fcache"));
        assert_eq!(p, PathBuf::from("/cache/b/a-e1.fcache.partial"));
    }
}
