use super::{create_from, merge_update, UpdatePolicy};
use crate::clients::{Delegate, HttpResponse, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::error::Result;
use crate::path::VIRTUAL_MACHINE_IMAGES;
use crate::registry::Manager;
use crate::spec::{ImageSpec, Serializable};

/// Virtual machine images.
#[derive(Debug, Clone)]
pub struct ImageManager {
    delegate: Delegate,
}

impl Manager for ImageManager {
    const KIND: &'static str = "image";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl ImageManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn get(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.get(
            &VIRTUAL_MACHINE_IMAGES.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Normalized> {
        self.delegate.get(
            &VIRTUAL_MACHINE_IMAGES.gateway_collection(namespace),
            RequestArgs::new(),
        )
    }

    pub fn create(&self, name: &str, namespace: &str, spec: &ImageSpec) -> Result<Normalized> {
        create_from(
            &self.delegate,
            &VIRTUAL_MACHINE_IMAGES.gateway_collection(Some(namespace)),
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
        let path = VIRTUAL_MACHINE_IMAGES.gateway(namespace, name);
        merge_update(&self.delegate, &path, name, namespace, data, policy)
    }

    pub fn delete(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate.delete(
            &VIRTUAL_MACHINE_IMAGES.gateway(namespace, name),
            RequestArgs::new(),
        )
    }

    /// The image contents, untouched.
    pub fn download(&self, name: &str, namespace: &str) -> Result<HttpResponse> {
        let path = format!("{}/download", VIRTUAL_MACHINE_IMAGES.gateway(namespace, name));
        self.delegate.get_raw(&path, RequestArgs::new())
    }
}
