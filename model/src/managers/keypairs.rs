use super::disallowed;
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::constants::HARVESTER_API_VERSION;
use crate::error::Result;
use crate::path::KEYPAIRS;
use crate::registry::Manager;
use crate::spec::Serializable;
use serde_json::json;

/// SSH public keys that can be injected into virtual machines. A keypair's key cannot be changed
/// once created; delete it and create a new one instead.
#[derive(Debug, Clone)]
pub struct KeypairManager {
    delegate: Delegate,
}

impl Manager for KeypairManager {
    const KIND: &'static str = "keypair";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
        }
    }
}

impl KeypairManager {
    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn get(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate
            .get(&KEYPAIRS.gateway(namespace, name), RequestArgs::new())
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Normalized> {
        self.delegate
            .get(&KEYPAIRS.gateway_collection(namespace), RequestArgs::new())
    }

    pub fn create(&self, name: &str, namespace: &str, public_key: &str) -> Result<Normalized> {
        let document = json!({
            "apiVersion": HARVESTER_API_VERSION,
            "kind": "KeyPair",
            "metadata": {"name": name, "namespace": namespace},
            "spec": {"publicKey": public_key},
        });
        self.delegate.create(
            &KEYPAIRS.gateway_collection(Some(namespace)),
            RequestArgs::new().json(document),
        )
    }

    pub fn update<D>(&self, _name: &str, _namespace: &str, _data: &D) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        disallowed("update", Self::KIND)
    }

    pub fn delete(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate
            .delete(&KEYPAIRS.gateway(namespace, name), RequestArgs::new())
    }
}
