use super::{action, create_from, merge_update, UpdatePolicy};
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::error::Result;
use crate::path::PERSISTENT_VOLUME_CLAIMS;
use crate::registry::Manager;
use crate::spec::{Serializable, VolumeSpec};
use serde_json::json;

/// Persistent volume claims backing virtual machine disks.
#[derive(Debug, Clone)]
pub struct VolumeManager {
    delegate: Delegate,
}

impl Manager for VolumeManager {
    const KIND: &'static str = "volume";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl VolumeManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn get(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.get(
            &PERSISTENT_VOLUME_CLAIMS.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Normalized> {
        self.delegate.get(
            &PERSISTENT_VOLUME_CLAIMS.gateway_collection(namespace),
            RequestArgs::new(),
        )
    }

    pub fn create(&self, name: &str, namespace: &str, spec: &VolumeSpec) -> Result<Normalized> {
        create_from(
            &self.delegate,
            &PERSISTENT_VOLUME_CLAIMS.gateway_collection(Some(namespace)),
            name,
            namespace,
            spec,
        )
    }

    pub fn update<D>(
        &self,
        name: &str,
        namespace: &str,
        data: &D,
        policy: UpdatePolicy,
    ) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        let path = PERSISTENT_VOLUME_CLAIMS.gateway(namespace, name);
        merge_update(&self.delegate, &path, name, namespace, data, policy)
    }

    pub fn delete(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.delete(
            &PERSISTENT_VOLUME_CLAIMS.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    /// Create an image named `image_name` from the volume's contents. The image is created in the
    /// volume's namespace.
    pub fn export(
        &self,
        name: &str,
        namespace: &str,
        image_name: &str,
        storage_class: Option<&str>,
    ) -> Result<Normalized> {
        let mut body = json!({"displayName": image_name, "namespace": namespace});
        if let Some(storage_class) = storage_class {
            body["storageClassName"] = json!(storage_class);
        }
        action(
            &self.delegate,
            &PERSISTENT_VOLUME_CLAIMS.gateway(namespace, name),
            "export",
            Some(body),
        )
    }
}
