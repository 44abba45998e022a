use super::{disallowed, merge_update, UpdatePolicy};
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::constants::{SETTING_BACKUP_TARGET, SETTING_SERVER_VERSION};
use crate::error::{self, Result};
use crate::path::SETTINGS;
use crate::registry::Manager;
use crate::spec::{str_at, BackupTargetSpec, Serializable, SpecModel};
use crate::ClusterVersion;
use snafu::OptionExt;

/// Cluster-wide settings. The set of settings is fixed by the server: they can be read and
/// changed, never created or deleted.
#[derive(Debug, Clone)]
pub struct SettingManager {
    delegate: Delegate,
}

impl Manager for SettingManager {
    const KIND: &'static str = "setting";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl SettingManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn get(&self, name: &str) -> Result<Normalized> {
        self.delegate
            .get(&SETTINGS.gateway("", name), RequestArgs::new())
    }

    pub fn list(&self) -> Result<Normalized> {
        self.delegate
            .get(&SETTINGS.gateway_collection(None), RequestArgs::new())
    }

    pub fn create<D>(&self, _name: &str, _data: &D) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        disallowed("create", Self::KIND)
    }

    pub fn update<D>(&self, name: &str, data: &D, policy: UpdatePolicy) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        merge_update(
            &self.delegate,
            &SETTINGS.gateway("", name),
            name,
            "",
            data,
            policy,
        )
    }

    pub fn delete(&self, _name: &str) -> Result<Normalized> {
        disallowed("delete", Self::KIND)
    }

    /// The version the cluster reports in the `server-version` setting.
    pub fn server_version(&self) -> Result<ClusterVersion> {
        let document = self
            .get(SETTING_SERVER_VERSION)?
            .into_document("get the server version")?;
        let value = str_at(&document, "/value").context(error::DocumentSnafu {
            what: "the server-version setting has no value",
        })?;
        ClusterVersion::parse(value)
    }

    /// The configured backup target, parsed.
    pub fn backup_target(&self) -> Result<BackupTargetSpec> {
        let document = self
            .get(SETTING_BACKUP_TARGET)?
            .into_document("get the backup target")?;
        BackupTargetSpec::from_document(document)
    }

    pub fn set_backup_target(&self, spec: &BackupTargetSpec) -> Result<Normalized> {
        self.update(SETTING_BACKUP_TARGET, spec, UpdatePolicy::default())
    }
}
