//! Mount configuration.
//!
//! Assembled from the target URL and the `-o option=value,...` list, then
//! validated before anything touches the network. Config errors are fatal
//! at startup.

use std::path::PathBuf;

use anyhow::{bail, Context};
use url::Url;

/// Everything one mount needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub mountpoint: PathBuf,
    /// Endpoint the object client talks to: `scheme://host[:port]`.
    pub endpoint: String,
    /// Bucket from the target URL path; `None` mounts every visible bucket.
    pub bucket: Option<String>,
    /// Remaining target URL path segments, joined under the bucket.
    pub base_path: String,
    /// Cache directory; required for persistent caching.
    pub cache_dir: Option<PathBuf>,
    /// Cache quota in GiB; 0 disables eviction deletion.
    pub quota_gb: f64,
    pub uid: u32,
    pub gid: u32,
    /// Permission bits for files surfaced through the mount.
    pub mode: u32,
    pub insecure: bool,
    pub debug: bool,
}

impl Config {
    /// Build a config from the command line pieces.
    ///
    /// # Arguments
    /// * `mountpoint` - Directory to mount on
    /// * `target` - `<scheme>://<host>[:port]/<bucket>[/<basePath>]`
    /// * `options` - Flattened `-o` options
    pub fn from_args(mountpoint: PathBuf, target: &str, options: &[String]) -> anyhow::Result<Self> {
        let url: Url = Url::parse(target).with_context(|| format!("malformed target: {target}"))?;
        let host: &str = url
            .host_str()
            .with_context(|| format!("target has no host: {target}"))?;

        let endpoint: String = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let bucket: Option<String> = if segments.is_empty() {
            None
        } else {
            Some(segments.remove(0).to_string())
        };
        let base_path: String = segments.join("/");

        let mut config = Config {
            mountpoint,
            endpoint,
            bucket,
            base_path,
            cache_dir: None,
            quota_gb: 0.0,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            mode: minfs_common::DEFAULT_FILE_MODE,
            insecure: false,
            debug: false,
        };
        config.apply_options(options)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_options(&mut self, options: &[String]) -> anyhow::Result<()> {
        for opt in options {
            match opt.split_once('=') {
                Some(("cache", value)) => self.cache_dir = Some(PathBuf::from(value)),
                Some(("quota", value)) => {
                    self.quota_gb = value
                        .parse()
                        .with_context(|| format!("bad quota value: {value}"))?;
                }
                Some(("uid", value)) => {
                    self.uid = value
                        .parse()
                        .with_context(|| format!("bad uid value: {value}"))?;
                }
                Some(("gid", value)) => {
                    self.gid = value
                        .parse()
                        .with_context(|| format!("bad gid value: {value}"))?;
                }
                Some(("mode", value)) => {
                    self.mode = u32::from_str_radix(value, 8)
                        .with_context(|| format!("bad mode value: {value}"))?;
                }
                None if opt == "insecure" => self.insecure = true,
                None if opt == "debug" => self.debug = true,
                _ => bail!("unrecognized option: {opt}"),
            }
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.mountpoint.as_os_str().is_empty() {
            bail!("mountpoint not set");
        }
        if self.quota_gb < 0.0 {
            bail!("quota must be non-negative");
        }
        if self.quota_gb > 0.0 && self.cache_dir.is_none() {
            bail!("quota requires a cache directory (-o cache=<path>)");
        }
        Ok(())
    }
}
