use crate::constants::DEFAULT_NAMESPACE;
use crate::error::{self, Result};
use http::Method;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Everything needed to reach a Harvester cluster.
///
/// ```yaml
/// endpoint: https://harvester.example.com
/// token: token-abcde:xyz
/// verifySsl: false
/// timeoutSeconds: 30
/// retry:
///   total: 3
///   backoffMillis: 300
///   statusForcelist: [500, 502, 504]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the cluster.
    pub endpoint: Url,
    /// Bearer token sent in the `Authorization` header of every request.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Connect and read timeout. Handed to the transport untouched.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Namespace used when an operation is not given one.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_verify_ssl() -> bool {
    true
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            token: None,
            verify_ssl: default_verify_ssl(),
            timeout_seconds: None,
            retry: RetryConfig::default(),
            namespace: default_namespace(),
        }
    }

    /// Read a `ClientConfig` from a YAML file.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        serde_yaml::from_str(&data).context(error::ConfigParseSnafu { path })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// The transport's retry policy. Retries use exponential backoff and apply only to idempotent
/// methods, either when the connection fails or when the status is in `status_forcelist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub total: u32,
    pub backoff_millis: u64,
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_millis: 300,
            status_forcelist: vec![500, 502, 504],
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            total: 0,
            ..Self::default()
        }
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        [
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::TRACE,
        ]
        .contains(method)
    }

    pub fn is_forced(&self, status: http::StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// The delay before retry number `attempt` (counting from 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_millis.saturating_mul(factor))
    }
}
