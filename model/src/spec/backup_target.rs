use super::{embedded_json_at, require_object, SpecModel};
use crate::constants::HARVESTER_API_VERSION;
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use snafu::ResultExt;

const OWNED_PATHS: &[&str] = &["/value"];

/// Where backups are stored. Serialized as the JSON string held by the `backup-target` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackupTarget {
    Nfs {
        /// `nfs://{server}:{path}`
        endpoint: String,
    },
    #[serde(rename_all = "camelCase")]
    S3 {
        /// Empty for AWS itself, otherwise the URL of an S3 compatible server.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        endpoint: String,
        bucket_name: String,
        bucket_region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret_access_key: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        virtual_hosted_style: bool,
        /// PEM encoded certificate of a self-signed S3 server.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cert: Option<String>,
    },
}

/// The `backup-target` setting. A `target` of `None` disables backups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackupTargetSpec {
    pub target: Option<BackupTarget>,
    backing: Option<Value>,
}

impl BackupTargetSpec {
    pub fn new(target: BackupTarget) -> Self {
        Self {
            target: Some(target),
            backing: None,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    fn value(&self) -> Result<String> {
        match &self.target {
            None => Ok(String::new()),
            Some(target) => {
                serde_json::to_string(target).context(error::SerdeSnafu { what: "backup target" })
            }
        }
    }
}

impl SpecModel for BackupTargetSpec {
    fn owned_paths(&self) -> &'static [&'static str] {
        OWNED_PATHS
    }

    fn to_delta(&self, name: &str, _namespace: &str) -> Result<Value> {
        Ok(json!({"metadata": {"name": name}, "value": self.value()?}))
    }

    // Settings are cluster scoped.
    fn scaffold(&self, name: &str, _namespace: &str) -> Value {
        json!({
            "apiVersion": HARVESTER_API_VERSION,
            "kind": "Setting",
            "metadata": {"name": name},
        })
    }

    fn from_document(document: Value) -> Result<Self> {
        require_object(&document, "backup target setting")?;
        Ok(Self {
            target: embedded_json_at(&document, "/value")?,
            backing: Some(document),
        })
    }

    fn backing(&self) -> Option<&Value> {
        self.backing.as_ref()
    }
}
