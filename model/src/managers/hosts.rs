use super::{action, disallowed, merge_update, UpdatePolicy};
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::error::Result;
use crate::path::NODES;
use crate::registry::Manager;
use crate::spec::Serializable;

/// Cluster nodes. Hosts join the cluster on their own, so they cannot be created.
#[derive(Debug, Clone)]
pub struct HostManager {
    delegate: Delegate,
}

impl Manager for HostManager {
    const KIND: &'static str = "host";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl HostManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    fn path(name: &str) -> String {
        NODES.gateway("", name)
    }

    pub fn get(&self, name: &str) -> Result<Normalized> {
        self.delegate.get(&Self::path(name), RequestArgs::new())
    }

    pub fn list(&self) -> Result<Normalized> {
        self.delegate
            .get(&NODES.gateway_collection(None), RequestArgs::new())
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
        merge_update(&self.delegate, &Self::path(name), name, "", data, policy)
    }

    pub fn delete(&self, name: &str) -> Result<Normalized> {
        self.delegate.delete(&Self::path(name), RequestArgs::new())
    }

    /// Move workloads off the host (`enable`) or bring it back into service.
    pub fn maintenance_mode(&self, name: &str, enable: bool) -> Result<Normalized> {
        let verb = if enable {
            "enableMaintenanceMode"
        } else {
            "disableMaintenanceMode"
        };
        action(&self.delegate, &Self::path(name), verb, None)
    }

    pub fn cordon(&self, name: &str) -> Result<Normalized> {
        action(&self.delegate, &Self::path(name), "cordon", None)
    }

    pub fn uncordon(&self, name: &str) -> Result<Normalized> {
        action(&self.delegate, &Self::path(name), "uncordon", None)
    }
}
