use crate::constants::{GATEWAY_PREFIX, HARVESTER_GROUP, KUBEVIRT_GROUP};

/// Where a kind of resource lives in the API, and how to build paths to it under either of the two
/// conventions the server accepts:
///
/// - gateway: `v1/harvester/{group}.{plural}/{namespace}/{name}` (group omitted for core kinds)
/// - kube: `apis/{group}/{version}/namespaces/{namespace}/{plural}/{name}` (`api/v1/...` for core)
///
/// Cluster-scoped resources ignore the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiResource {
    pub group: Option<&'static str>,
    pub version: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
}

impl ApiResource {
    fn gateway_kind(&self) -> String {
        match self.group {
            Some(group) => format!("{}.{}", group, self.plural),
            None => self.plural.to_string(),
        }
    }

    fn kube_prefix(&self) -> String {
        match self.group {
            Some(group) => format!("apis/{}/{}", group, self.version),
            None => format!("api/{}", self.version),
        }
    }

    /// The gateway path of the collection, optionally narrowed to one namespace.
    pub fn gateway_collection(&self, namespace: Option<&str>) -> String {
        let mut path = format!("{}/{}", GATEWAY_PREFIX, self.gateway_kind());
        if let Some(namespace) = namespace.filter(|_| self.namespaced) {
            path.push('/');
            path.push_str(namespace);
        }
        path
    }

    /// The gateway path of one object.
    pub fn gateway(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.gateway_collection(Some(namespace)), name)
    }

    /// The kube path of the collection, optionally narrowed to one namespace.
    pub fn kube_collection(&self, namespace: Option<&str>) -> String {
        match namespace.filter(|_| self.namespaced) {
            Some(namespace) => format!(
                "{}/namespaces/{}/{}",
                self.kube_prefix(),
                namespace,
                self.plural
            ),
            None => format!("{}/{}", self.kube_prefix(), self.plural),
        }
    }

    /// The kube path of one object.
    pub fn kube(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.kube_collection(Some(namespace)), name)
    }
}

pub const NODES: ApiResource = ApiResource {
    group: None,
    version: "v1",
    plural: "nodes",
    namespaced: false,
};

pub const PERSISTENT_VOLUME_CLAIMS: ApiResource = ApiResource {
    group: None,
    version: "v1",
    plural: "persistentvolumeclaims",
    namespaced: true,
};

pub const VIRTUAL_MACHINES: ApiResource = ApiResource {
    group: Some(KUBEVIRT_GROUP),
    version: "v1",
    plural: "virtualmachines",
    namespaced: true,
};

pub const VIRTUAL_MACHINE_IMAGES: ApiResource = ApiResource {
    group: Some(HARVESTER_GROUP),
    version: "v1beta1",
    plural: "virtualmachineimages",
    namespaced: true,
};

pub const VIRTUAL_MACHINE_BACKUPS: ApiResource = ApiResource {
    group: Some(HARVESTER_GROUP),
    version: "v1beta1",
    plural: "virtualmachinebackups",
    namespaced: true,
};

pub const KEYPAIRS: ApiResource = ApiResource {
    group: Some(HARVESTER_GROUP),
    version: "v1beta1",
    plural: "keypairs",
    namespaced: true,
};

pub const SETTINGS: ApiResource = ApiResource {
    group: Some(HARVESTER_GROUP),
    version: "v1beta1",
    plural: "settings",
    namespaced: false,
};

#[test]
fn gateway_paths() {
    assert_eq!(
        VIRTUAL_MACHINES.gateway("default", "vm-1"),
        "v1/harvester/kubevirt.io.virtualmachines/default/vm-1"
    );
    assert_eq!(
        PERSISTENT_VOLUME_CLAIMS.gateway_collection(Some("ns")),
        "v1/harvester/persistentvolumeclaims/ns"
    );
    assert_eq!(
        SETTINGS.gateway("ignored", "server-version"),
        "v1/harvester/harvesterhci.io.settings/server-version"
    );
    assert_eq!(
        KEYPAIRS.gateway_collection(None),
        "v1/harvester/harvesterhci.io.keypairs"
    );
}

#[test]
fn kube_paths() {
    assert_eq!(
        VIRTUAL_MACHINES.kube("default", "vm-1"),
        "apis/kubevirt.io/v1/namespaces/default/virtualmachines/vm-1"
    );
    assert_eq!(NODES.kube("", "node-0"), "api/v1/nodes/node-0");
    assert_eq!(
        PERSISTENT_VOLUME_CLAIMS.kube_collection(None),
        "api/v1/persistentvolumeclaims"
    );
}
