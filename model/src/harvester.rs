use crate::clients::{ReqwestTransport, Session, SessionHandle, Transport};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::managers::{
    BackupManager, HostManager, ImageManager, KeypairManager, SettingManager,
    VirtualMachineManager, VolumeManager, VM_RUN_STRATEGY_VARIANT,
};
use crate::registry::{Manager, ManagerRegistry};
use crate::ClusterVersion;
use log::info;
use std::rc::Rc;
use url::Url;

impl ManagerRegistry {
    /// The registry holding every variant this crate provides.
    pub fn harvester() -> Result<Self> {
        let mut registry = Self::new();
        registry.register::<VirtualMachineManager>(
            VM_RUN_STRATEGY_VARIANT,
            "v1.1.0",
            VirtualMachineManager::with_run_strategy,
        )?;
        Ok(registry)
    }
}

/// One of each manager, resolved for a cluster version.
#[derive(Debug)]
struct Managers {
    hosts: HostManager,
    keypairs: KeypairManager,
    images: ImageManager,
    volumes: VolumeManager,
    virtual_machines: VirtualMachineManager,
    settings: SettingManager,
    backups: BackupManager,
    selected: Vec<(&'static str, &'static str)>,
}

impl Managers {
    fn resolve(registry: &ManagerRegistry, session: &Rc<Session>) -> Self {
        let version = session.cluster_version();
        let handle = SessionHandle::new(session);
        let mut selected = Vec::new();
        Self {
            hosts: pick(registry, &version, &handle, &mut selected),
            keypairs: pick(registry, &version, &handle, &mut selected),
            images: pick(registry, &version, &handle, &mut selected),
            volumes: pick(registry, &version, &handle, &mut selected),
            virtual_machines: pick(registry, &version, &handle, &mut selected),
            settings: pick(registry, &version, &handle, &mut selected),
            backups: pick(registry, &version, &handle, &mut selected),
            selected,
        }
    }
}

fn pick<M>(
    registry: &ManagerRegistry,
    version: &ClusterVersion,
    handle: &SessionHandle,
    selected: &mut Vec<(&'static str, &'static str)>,
) -> M
where
    M: Manager,
{
    let (manager, variant) = registry.build::<M>(version, handle.clone());
    selected.push((M::KIND, variant));
    manager
}

/// The entry point to a Harvester cluster.
///
/// The client owns the session every manager sends its requests through. Managers only hold a
/// weak handle to it: a manager cloned out of a client that has since been dropped fails every
/// operation with `Error::ClientGone`.
///
/// ```no_run
/// # fn main() -> harvester_model::Result<()> {
/// use harvester_model::{ClientConfig, HarvesterClient};
///
/// let config = ClientConfig::new("https://harvester.example.com".parse().unwrap());
/// let client = HarvesterClient::connect(&config)?;
/// let (status, payload) = client.virtual_machines().get("vm-1", "default")?.into_parts();
/// println!("{} {:?}", status, payload);
/// # Ok(())
/// # }
/// ```
pub struct HarvesterClient {
    session: Rc<Session>,
    registry: ManagerRegistry,
    managers: Managers,
}

impl HarvesterClient {
    /// Connect with the configured transport, read the cluster version, and resolve every
    /// manager for it.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        let mut client = Self::with_transport(
            Box::new(transport),
            config.endpoint.clone(),
            &config.namespace,
            ClusterVersion::default(),
        )?;
        client.refresh_version()?;
        Ok(client)
    }

    /// Build a client around any transport for a cluster whose version is already known. Nothing
    /// is sent.
    pub fn with_transport<S>(
        transport: Box<dyn Transport>,
        endpoint: Url,
        namespace: S,
        version: ClusterVersion,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let session = Rc::new(Session::new(transport, endpoint, namespace, version));
        let registry = ManagerRegistry::harvester()?;
        let managers = Managers::resolve(&registry, &session);
        Ok(Self {
            session,
            registry,
            managers,
        })
    }

    /// Replace the registration table and resolve every manager again.
    pub fn with_registry(mut self, registry: ManagerRegistry) -> Self {
        self.registry = registry;
        self.managers = Managers::resolve(&self.registry, &self.session);
        self
    }

    pub fn registry(&self) -> &ManagerRegistry {
        &self.registry
    }

    /// Read the version from the cluster again, which may have been upgraded since, and resolve
    /// every manager for it. Managers obtained before this keep their old variant.
    pub fn refresh_version(&mut self) -> Result<ClusterVersion> {
        let version = self.managers.settings.server_version()?;
        if version != self.session.cluster_version() {
            info!("cluster version is {}", version);
        }
        self.session.set_cluster_version(version.clone());
        self.managers = Managers::resolve(&self.registry, &self.session);
        Ok(version)
    }

    pub fn cluster_version(&self) -> ClusterVersion {
        self.session.cluster_version()
    }

    pub fn endpoint(&self) -> &Url {
        self.session.endpoint()
    }

    /// The namespace to use when the caller has not named one.
    pub fn namespace(&self) -> &str {
        self.session.namespace()
    }

    /// `(kind, variant)` for every manager, in the order they were resolved.
    pub fn variants(&self) -> &[(&'static str, &'static str)] {
        &self.managers.selected
    }

    pub fn hosts(&self) -> &HostManager {
        &self.managers.hosts
    }

    pub fn keypairs(&self) -> &KeypairManager {
        &self.managers.keypairs
    }

    pub fn images(&self) -> &ImageManager {
        &self.managers.images
    }

    pub fn volumes(&self) -> &VolumeManager {
        &self.managers.volumes
    }

    pub fn virtual_machines(&self) -> &VirtualMachineManager {
        &self.managers.virtual_machines
    }

    pub fn settings(&self) -> &SettingManager {
        &self.managers.settings
    }

    pub fn backups(&self) -> &BackupManager {
        &self.managers.backups
    }
}
