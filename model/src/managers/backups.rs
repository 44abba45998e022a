use super::{action, disallowed};
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::error::Result;
use crate::path::VIRTUAL_MACHINE_BACKUPS;
use crate::registry::Manager;
use crate::spec::Serializable;
use serde_json::{json, Value};

/// Where a backup is restored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restore {
    /// Create a new virtual machine from the backup.
    New { vm_name: String },
    /// Overwrite the virtual machine that was backed up, which must be stopped. The volumes being
    /// replaced are deleted when `delete_volumes` is set and kept otherwise.
    Replace { vm_name: String, delete_volumes: bool },
}

impl Restore {
    fn body(&self) -> Value {
        match self {
            Restore::New { vm_name } => json!({"name": vm_name, "keepMacAddress": false}),
            Restore::Replace {
                vm_name,
                delete_volumes,
            } => json!({
                "name": vm_name,
                "deletionPolicy": if *delete_volumes { "delete" } else { "retain" },
            }),
        }
    }
}

/// Virtual machine backups. Backups are taken through `VirtualMachineManager::backup`, and are
/// immutable once taken.
#[derive(Debug, Clone)]
pub struct BackupManager {
    delegate: Delegate,
}

impl Manager for BackupManager {
    const KIND: &'static str = "backup";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl BackupManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn get(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.get(
            &VIRTUAL_MACHINE_BACKUPS.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Normalized> {
        self.delegate.get(
            &VIRTUAL_MACHINE_BACKUPS.gateway_collection(namespace),
            RequestArgs::new(),
        )
    }

    pub fn create<D>(&self, _name: &str, _namespace: &str, _data: &D) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        disallowed("create", Self::KIND)
    }

    pub fn update<D>(&self, _name: &str, _namespace: &str, _data: &D) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        disallowed("update", Self::KIND)
    }

    pub fn delete(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.delete(
            &VIRTUAL_MACHINE_BACKUPS.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    pub fn restore(&self, name: &str, namespace: &str, target: &Restore) -> Result<Normalized> {
        action(
            &self.delegate,
            &VIRTUAL_MACHINE_BACKUPS.gateway(namespace, name),
            "restore",
            Some(target.body()),
        )
    }
}
