use super::{array_at, cloud_init, embedded_json_at, overlay, require_object, str_at, string_at};
use super::{NamedList, SpecModel};
use crate::constants::{
    ANNOTATION_DESCRIPTION, ANNOTATION_IMAGE_ID, ANNOTATION_SSH_NAMES,
    ANNOTATION_VOLUME_CLAIM_TEMPLATES, CLOUD_INIT_DISK, KUBEVIRT_API_VERSION, LABEL_CREATOR,
    LABEL_VM_NAME,
};
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use snafu::ResultExt;

const DOMAIN: &str = "/spec/template/spec/domain";

const OWNED_PATHS: &[&str] = &[
    "/metadata/annotations/field.cattle.io~1description",
    "/metadata/annotations/harvesterhci.io~1volumeClaimTemplates",
    "/spec/running",
    "/spec/runStrategy",
    "/spec/template/metadata/annotations/harvesterhci.io~1sshNames",
    "/spec/template/spec/domain/devices/disks",
    "/spec/template/spec/domain/devices/interfaces",
    "/spec/template/spec/domain/features/smm",
    "/spec/template/spec/domain/firmware/bootloader",
    "/spec/template/spec/networks",
    "/spec/template/spec/volumes",
];

/// Lists whose entries keep the fields this spec does not model, e.g. a disk's `serial` or an
/// interface's `ports`.
const NAMED_LISTS: &[NamedList] = &[
    NamedList {
        pointer: "/spec/template/spec/domain/devices/disks",
        owned: &[],
        exclusive: &["disk", "cdrom", "lun"],
    },
    NamedList {
        pointer: "/spec/template/spec/domain/devices/interfaces",
        owned: &["/macAddress"],
        exclusive: &["masquerade", "bridge"],
    },
    NamedList {
        pointer: "/spec/template/spec/networks",
        owned: &[],
        exclusive: &["pod", "multus"],
    },
    NamedList {
        pointer: "/spec/template/spec/volumes",
        owned: &[
            "/cloudInitNoCloud/userData",
            "/cloudInitNoCloud/networkData",
            "/cloudInitNoCloud/secretRef",
            "/cloudInitNoCloud/networkDataSecretRef",
        ],
        exclusive: &["persistentVolumeClaim", "containerDisk", "cloudInitNoCloud"],
    },
];

const CLAIM_OWNED_PATHS: &[&str] = &[
    "/metadata/annotations/harvesterhci.io~1imageId",
    "/spec/storageClassName",
];

/// KubeVirt's `runStrategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStrategy {
    Always,
    RerunOnFailure,
    Halted,
    Manual,
    Once,
}

serde_plain::derive_display_from_serialize!(RunStrategy);

/// How the desired power state is expressed. Clusters before v1.1.0 use the `running` boolean,
/// later ones use `runStrategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Running(bool),
    Strategy(RunStrategy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskBus {
    #[default]
    Virtio,
    Sata,
    Scsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiskKind {
    #[default]
    Disk,
    Cdrom,
}

impl DiskKind {
    fn key(&self) -> &'static str {
        match self {
            DiskKind::Disk => "disk",
            DiskKind::Cdrom => "cdrom",
        }
    }
}

/// A volume created together with the virtual machine, described in the
/// `harvesterhci.io/volumeClaimTemplates` annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTemplate {
    /// Defaults to `{vm name}-{disk name}`.
    pub claim_name: Option<String>,
    pub size: String,
    pub storage_class: Option<String>,
    /// `{namespace}/{name}` of the image the volume is populated from.
    pub image_id: Option<String>,
    /// The template this was parsed from.
    template: Value,
}

impl ClaimTemplate {
    pub fn new<S>(size: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            claim_name: None,
            size: size.into(),
            storage_class: None,
            image_id: None,
            template: Value::Null,
        }
    }

    fn claim_name(&self, vm_name: &str, disk_name: &str) -> String {
        self.claim_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", vm_name, disk_name))
    }

    fn to_document(&self, claim_name: &str) -> Result<Value> {
        let base = if self.template.is_object() {
            self.template.clone()
        } else {
            json!({"spec": {"accessModes": ["ReadWriteMany"], "volumeMode": "Block"}})
        };
        let mut delta = json!({
            "metadata": {"name": claim_name},
            "spec": {"resources": {"requests": {"storage": self.size}}},
        });
        if let Some(image_id) = &self.image_id {
            delta["metadata"]["annotations"] = json!({ ANNOTATION_IMAGE_ID: image_id });
        }
        if let Some(storage_class) = &self.storage_class {
            delta["spec"]["storageClassName"] = json!(storage_class);
        }
        overlay(&base, delta, CLAIM_OWNED_PATHS)
    }

    fn from_document(template: &Value) -> Self {
        Self {
            claim_name: string_at(template, "/metadata/name"),
            size: string_at(template, "/spec/resources/requests/storage").unwrap_or_default(),
            storage_class: string_at(template, "/spec/storageClassName"),
            image_id: string_at(template, "/metadata/annotations/harvesterhci.io~1imageId"),
            template: template.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiskSource {
    New(ClaimTemplate),
    Existing { claim_name: String },
    ContainerDisk { image: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VmDisk {
    pub name: String,
    pub bus: DiskBus,
    pub kind: DiskKind,
    pub source: DiskSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkKind {
    /// The pod network, reached through masquerade.
    Pod,
    /// A VLAN network attached over a bridge, named `{namespace}/{name}`.
    Multus { network_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VmNetwork {
    pub name: String,
    pub model: String,
    pub kind: NetworkKind,
    pub mac_address: Option<String>,
}

impl VmNetwork {
    pub fn pod() -> Self {
        Self {
            name: "default".to_string(),
            model: "virtio".to_string(),
            kind: NetworkKind::Pod,
            mac_address: None,
        }
    }
}

/// A builder for KubeVirt `VirtualMachine` documents as Harvester creates them.
///
/// Disks boot in the order they are listed. The cloud-init disk and volume are derived from
/// `user_data` and `network_data` every time the spec is serialized. Either may instead come from
/// a secret, which is how the Harvester UI stores them; inline data wins when both are set.
#[derive(Debug, Clone, PartialEq)]
pub struct VmSpec {
    pub cpu_cores: u64,
    /// A Kubernetes quantity, e.g. `4Gi`.
    pub memory: String,
    pub description: String,
    pub run_mode: RunMode,
    pub hostname: Option<String>,
    pub disks: Vec<VmDisk>,
    pub networks: Vec<VmNetwork>,
    pub user_data: String,
    pub network_data: String,
    /// Name of a secret in the VM's namespace holding the user data under `userdata`.
    pub user_data_secret: Option<String>,
    /// Name of a secret in the VM's namespace holding the network data under `networkdata`.
    pub network_data_secret: Option<String>,
    /// Keypairs to inject, as `{namespace}/{name}`.
    pub ssh_keys: Vec<String>,
    efi_boot: bool,
    secure_boot: bool,
    backing: Option<Value>,
}

impl VmSpec {
    pub fn new<S>(cpu_cores: u64, memory: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            cpu_cores,
            memory: memory.into(),
            description: String::new(),
            run_mode: RunMode::Running(true),
            hostname: None,
            disks: Vec::new(),
            networks: vec![VmNetwork::pod()],
            user_data: String::new(),
            network_data: String::new(),
            user_data_secret: None,
            network_data_secret: None,
            ssh_keys: Vec::new(),
            efi_boot: false,
            secure_boot: false,
            backing: None,
        }
    }

    /// Add a new, empty volume.
    pub fn add_volume<N, S>(&mut self, name: N, size: S) -> &mut Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        self.disks.push(VmDisk {
            name: name.into(),
            bus: DiskBus::default(),
            kind: DiskKind::default(),
            source: DiskSource::New(ClaimTemplate::new(size)),
        });
        self
    }

    /// Add a new volume populated from an image, `image_id` being `{namespace}/{name}`.
    pub fn add_image<N, S, I>(&mut self, name: N, size: S, image_id: I) -> &mut Self
    where
        N: Into<String>,
        S: Into<String>,
        I: Into<String>,
    {
        let mut template = ClaimTemplate::new(size);
        template.image_id = Some(image_id.into());
        self.disks.push(VmDisk {
            name: name.into(),
            bus: DiskBus::default(),
            kind: DiskKind::default(),
            source: DiskSource::New(template),
        });
        self
    }

    /// Attach a volume that already exists.
    pub fn add_existing_volume<N, C>(&mut self, name: N, claim_name: C) -> &mut Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        self.disks.push(VmDisk {
            name: name.into(),
            bus: DiskBus::default(),
            kind: DiskKind::default(),
            source: DiskSource::Existing {
                claim_name: claim_name.into(),
            },
        });
        self
    }

    /// Attach a bridged VLAN network, `network_name` being `{namespace}/{name}`.
    pub fn add_network<N, M>(&mut self, name: N, network_name: M) -> &mut Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        self.networks.push(VmNetwork {
            name: name.into(),
            model: "virtio".to_string(),
            kind: NetworkKind::Multus {
                network_name: network_name.into(),
            },
            mac_address: None,
        });
        self
    }

    pub fn efi_boot(&self) -> bool {
        self.efi_boot
    }

    /// Turning EFI off also turns secure boot off.
    pub fn set_efi_boot(&mut self, enabled: bool) {
        self.efi_boot = enabled;
        if !enabled {
            self.secure_boot = false;
        }
    }

    pub fn secure_boot(&self) -> bool {
        self.secure_boot
    }

    /// Secure boot needs both EFI and SMM, so turning it on turns EFI on.
    pub fn set_secure_boot(&mut self, enabled: bool) {
        self.secure_boot = enabled;
        if enabled {
            self.efi_boot = true;
        }
    }

    /// Whether the cloud-init user data installs and starts the QEMU guest agent.
    pub fn guest_agent(&self) -> Result<bool> {
        cloud_init::has_guest_agent(&self.user_data)
    }

    pub fn set_guest_agent(&mut self, enabled: bool) -> Result<()> {
        self.user_data = cloud_init::set_guest_agent(&self.user_data, enabled)?;
        Ok(())
    }

    fn has_cloud_init(&self) -> bool {
        !self.user_data.is_empty()
            || !self.network_data.is_empty()
            || self.user_data_secret.is_some()
            || self.network_data_secret.is_some()
    }

    fn cloud_init_source(&self) -> Map<String, Value> {
        let mut no_cloud = Map::new();
        match (&self.user_data_secret, self.user_data.is_empty()) {
            (Some(secret), true) => {
                no_cloud.insert("secretRef".into(), json!({ "name": secret }));
            }
            _ => {
                no_cloud.insert("userData".into(), json!(self.user_data));
            }
        }
        if !self.network_data.is_empty() {
            no_cloud.insert("networkData".into(), json!(self.network_data));
        } else if let Some(secret) = &self.network_data_secret {
            no_cloud.insert("networkDataSecretRef".into(), json!({ "name": secret }));
        }
        no_cloud
    }

    fn disks_and_volumes(&self, vm_name: &str) -> Result<(Vec<Value>, Vec<Value>, Vec<Value>)> {
        let mut disks = Vec::new();
        let mut volumes = Vec::new();
        let mut claim_templates = Vec::new();
        for (index, disk) in self.disks.iter().enumerate() {
            let mut device = Map::new();
            device.insert("name".into(), json!(disk.name));
            device.insert(disk.kind.key().into(), json!({ "bus": disk.bus }));
            device.insert("bootOrder".into(), json!(index + 1));
            disks.push(Value::Object(device));

            let volume = match &disk.source {
                DiskSource::New(template) => {
                    let claim_name = template.claim_name(vm_name, &disk.name);
                    claim_templates.push(template.to_document(&claim_name)?);
                    json!({"name": disk.name, "persistentVolumeClaim": {"claimName": claim_name}})
                }
                DiskSource::Existing { claim_name } => {
                    json!({"name": disk.name, "persistentVolumeClaim": {"claimName": claim_name}})
                }
                DiskSource::ContainerDisk { image } => {
                    json!({"name": disk.name, "containerDisk": {"image": image}})
                }
            };
            volumes.push(volume);
        }
        if self.has_cloud_init() {
            disks.push(json!({"name": CLOUD_INIT_DISK, "disk": {"bus": DiskBus::Virtio}}));
            volumes.push(json!({
                "name": CLOUD_INIT_DISK,
                "cloudInitNoCloud": self.cloud_init_source(),
            }));
        }
        Ok((disks, volumes, claim_templates))
    }

    fn interfaces_and_networks(&self) -> (Vec<Value>, Vec<Value>) {
        self.networks
            .iter()
            .map(|network| {
                let mut interface = Map::new();
                interface.insert("name".into(), json!(network.name));
                interface.insert("model".into(), json!(network.model));
                if let Some(mac) = &network.mac_address {
                    interface.insert("macAddress".into(), json!(mac));
                }
                let attachment = match &network.kind {
                    NetworkKind::Pod => {
                        interface.insert("masquerade".into(), json!({}));
                        json!({"name": network.name, "pod": {}})
                    }
                    NetworkKind::Multus { network_name } => {
                        interface.insert("bridge".into(), json!({}));
                        json!({"name": network.name, "multus": {"networkName": network_name}})
                    }
                };
                (Value::Object(interface), attachment)
            })
            .unzip()
    }
}

fn parse_disk(disk: &Value, volumes: &[Value], templates: &[Value]) -> Result<VmDisk> {
    let name = string_at(disk, "/name").unwrap_or_default();
    let kind = if disk.get("cdrom").is_some() {
        DiskKind::Cdrom
    } else {
        DiskKind::Disk
    };
    let bus = disk
        .get(kind.key())
        .and_then(|device| device.get("bus"))
        .and_then(|bus| serde_json::from_value(bus.clone()).ok())
        .unwrap_or_default();
    let volume = volumes
        .iter()
        .find(|volume| str_at(volume, "/name") == Some(name.as_str()));
    let source = match volume {
        Some(volume) => {
            if let Some(claim_name) = str_at(volume, "/persistentVolumeClaim/claimName") {
                match templates
                    .iter()
                    .find(|template| str_at(template, "/metadata/name") == Some(claim_name))
                {
                    Some(template) => DiskSource::New(ClaimTemplate::from_document(template)),
                    None => DiskSource::Existing {
                        claim_name: claim_name.to_string(),
                    },
                }
            } else if let Some(image) = str_at(volume, "/containerDisk/image") {
                DiskSource::ContainerDisk {
                    image: image.to_string(),
                }
            } else {
                return error::DocumentSnafu {
                    what: format!("disk '{}' is backed by an unsupported volume", name),
                }
                .fail();
            }
        }
        None => {
            return error::DocumentSnafu {
                what: format!("disk '{}' has no volume", name),
            }
            .fail()
        }
    };
    Ok(VmDisk {
        name,
        bus,
        kind,
        source,
    })
}

fn parse_network(interface: &Value, networks: &[Value]) -> VmNetwork {
    let name = string_at(interface, "/name").unwrap_or_default();
    let network_name = networks
        .iter()
        .find(|network| str_at(network, "/name") == Some(name.as_str()))
        .and_then(|network| string_at(network, "/multus/networkName"));
    VmNetwork {
        model: string_at(interface, "/model").unwrap_or_else(|| "virtio".to_string()),
        mac_address: string_at(interface, "/macAddress"),
        kind: match network_name {
            Some(network_name) => NetworkKind::Multus { network_name },
            None => NetworkKind::Pod,
        },
        name,
    }
}

fn parse_cloud_init(volume: &Value) -> Result<&Map<String, Value>> {
    let no_cloud = volume.get("cloudInitNoCloud").and_then(Value::as_object);
    match no_cloud {
        Some(no_cloud)
            if ["userData", "networkData", "secretRef", "networkDataSecretRef"]
                .iter()
                .any(|key| no_cloud.contains_key(*key)) =>
        {
            Ok(no_cloud)
        }
        _ => error::DocumentSnafu {
            what: "the cloud-init volume uses an unsupported source",
        }
        .fail(),
    }
}

impl SpecModel for VmSpec {
    fn owned_paths(&self) -> &'static [&'static str] {
        OWNED_PATHS
    }

    fn overlay_onto(&self, base: &Value, name: &str, namespace: &str) -> Result<Value> {
        let mut delta = self.to_delta(name, namespace)?;
        for list in NAMED_LISTS {
            list.overlay_entries(base, &mut delta)?;
        }
        overlay(base, delta, OWNED_PATHS)
    }

    fn to_delta(&self, name: &str, namespace: &str) -> Result<Value> {
        let (disks, volumes, claim_templates) = self.disks_and_volumes(name)?;
        let (interfaces, networks) = self.interfaces_and_networks();

        let claim_templates = serde_json::to_string(&claim_templates)
            .context(error::SerdeSnafu { what: "volume claim templates" })?;
        let mut annotations = Map::new();
        annotations.insert(ANNOTATION_VOLUME_CLAIM_TEMPLATES.into(), json!(claim_templates));
        if !self.description.is_empty() {
            annotations.insert(ANNOTATION_DESCRIPTION.into(), json!(self.description));
        }

        let mut spec = json!({
            "template": {
                "spec": {
                    "domain": {
                        "cpu": {"cores": self.cpu_cores, "sockets": 1, "threads": 1},
                        "resources": {"limits": {"cpu": self.cpu_cores, "memory": self.memory}},
                        "devices": {"disks": disks, "interfaces": interfaces},
                    },
                    "networks": networks,
                    "volumes": volumes,
                },
            },
        });
        match self.run_mode {
            RunMode::Running(running) => spec["running"] = json!(running),
            RunMode::Strategy(strategy) => spec["runStrategy"] = json!(strategy),
        }
        if !self.ssh_keys.is_empty() {
            let ssh_names = serde_json::to_string(&self.ssh_keys)
                .context(error::SerdeSnafu { what: "ssh key names" })?;
            spec["template"]["metadata"] =
                json!({"annotations": { ANNOTATION_SSH_NAMES: ssh_names }});
        }
        if let Some(hostname) = &self.hostname {
            spec["template"]["spec"]["hostname"] = json!(hostname);
        }
        let domain = &mut spec["template"]["spec"]["domain"];
        if self.secure_boot {
            domain["features"] = json!({"smm": {"enabled": true}});
        }
        if self.efi_boot {
            domain["firmware"] =
                json!({"bootloader": {"efi": {"secureBoot": self.secure_boot}}});
        }

        Ok(json!({
            "metadata": {"name": name, "namespace": namespace, "annotations": annotations},
            "spec": spec,
        }))
    }

    fn scaffold(&self, name: &str, namespace: &str) -> Value {
        json!({
            "apiVersion": KUBEVIRT_API_VERSION,
            "kind": "VirtualMachine",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": {LABEL_CREATOR: "harvester"},
            },
            "spec": {
                "template": {
                    "metadata": {"labels": {LABEL_VM_NAME: name}},
                    "spec": {
                        "domain": {
                            "machine": {"type": "q35"},
                            "features": {"acpi": {"enabled": true}},
                        },
                        "evictionStrategy": "LiveMigrate",
                        "hostname": name,
                        "terminationGracePeriodSeconds": 120,
                    },
                },
            },
        })
    }

    fn from_document(document: Value) -> Result<Self> {
        require_object(&document, "virtual machine")?;
        let domain = |path: &str| format!("{}{}", DOMAIN, path);

        let run_mode = match document.pointer("/spec/runStrategy") {
            Some(strategy) => RunMode::Strategy(
                serde_json::from_value(strategy.clone())
                    .context(error::SerdeSnafu { what: "runStrategy" })?,
            ),
            None => RunMode::Running(
                document
                    .pointer("/spec/running")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            ),
        };

        let templates: Vec<Value> = embedded_json_at(
            &document,
            "/metadata/annotations/harvesterhci.io~1volumeClaimTemplates",
        )?
        .unwrap_or_default();
        let volumes = array_at(&document, "/spec/template/spec/volumes");
        let mut devices: Vec<&Value> = array_at(&document, &domain("/devices/disks"))
            .iter()
            .filter(|disk| str_at(disk, "/name") != Some(CLOUD_INIT_DISK))
            .collect();
        devices.sort_by_key(|disk| {
            disk.get("bootOrder")
                .and_then(Value::as_u64)
                .unwrap_or(u64::MAX)
        });
        let disks = devices
            .into_iter()
            .map(|disk| parse_disk(disk, volumes, &templates))
            .collect::<Result<Vec<_>>>()?;

        let networks = array_at(&document, "/spec/template/spec/networks");
        let networks = array_at(&document, &domain("/devices/interfaces"))
            .iter()
            .map(|interface| parse_network(interface, networks))
            .collect();

        let cloud_init = volumes
            .iter()
            .find(|volume| str_at(volume, "/name") == Some(CLOUD_INIT_DISK))
            .map(parse_cloud_init)
            .transpose()?;
        let inline = |key: &str| {
            cloud_init
                .and_then(|no_cloud| no_cloud.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let secret = |key: &str| {
            cloud_init
                .and_then(|no_cloud| no_cloud.get(key))
                .and_then(|reference| string_at(reference, "/name"))
        };

        let efi = document.pointer(&domain("/firmware/bootloader/efi"));
        Ok(Self {
            cpu_cores: document
                .pointer(&domain("/cpu/cores"))
                .and_then(Value::as_u64)
                .unwrap_or(1),
            memory: string_at(&document, &domain("/resources/limits/memory")).unwrap_or_default(),
            description: string_at(
                &document,
                "/metadata/annotations/field.cattle.io~1description",
            )
            .unwrap_or_default(),
            run_mode,
            hostname: string_at(&document, "/spec/template/spec/hostname"),
            disks,
            networks,
            user_data: inline("userData").unwrap_or_default(),
            network_data: inline("networkData").unwrap_or_default(),
            user_data_secret: secret("secretRef"),
            network_data_secret: secret("networkDataSecretRef"),
            ssh_keys: embedded_json_at(
                &document,
                "/spec/template/metadata/annotations/harvesterhci.io~1sshNames",
            )?
            .unwrap_or_default(),
            efi_boot: efi.is_some(),
            secure_boot: efi
                .and_then(|efi| efi.get("secureBoot"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            backing: Some(document),
        })
    }

    fn backing(&self) -> Option<&Value> {
        self.backing.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spec::Serializable;

    fn spec() -> VmSpec {
        let mut spec = VmSpec::new(2, "4Gi");
        spec.add_image("rootdisk", "10Gi", "default/ubuntu")
            .add_volume("data", "20Gi");
        spec.user_data = "#cloud-config\npassword: secret\n".to_string();
        spec
    }

    #[test]
    fn fresh_document() {
        let document = spec().render("vm-1", "default").unwrap();
        assert_eq!(document["kind"], "VirtualMachine");
        assert_eq!(document["spec"]["running"], true);
        assert!(document["spec"].get("runStrategy").is_none());
        let domain = &document["spec"]["template"]["spec"]["domain"];
        assert_eq!(domain["cpu"]["cores"], 2);
        assert_eq!(domain["resources"]["limits"]["memory"], "4Gi");
        assert_eq!(domain["features"]["acpi"]["enabled"], true);
        assert!(domain["features"].get("smm").is_none());

        let disks = domain["devices"]["disks"].as_array().unwrap();
        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0], json!({"name": "rootdisk", "disk": {"bus": "virtio"}, "bootOrder": 1}));
        assert_eq!(disks[1]["bootOrder"], 2);
        assert_eq!(disks[2], json!({"name": "cloudinitdisk", "disk": {"bus": "virtio"}}));

        let volumes = document["spec"]["template"]["spec"]["volumes"].as_array().unwrap();
        assert_eq!(volumes[0]["persistentVolumeClaim"]["claimName"], "vm-1-rootdisk");
        assert_eq!(
            volumes[2]["cloudInitNoCloud"]["userData"],
            "#cloud-config\npassword: secret\n"
        );

        let templates: Vec<Value> = serde_json::from_str(
            document["metadata"]["annotations"]["harvesterhci.io/volumeClaimTemplates"]
                .as_str()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0]["metadata"]["name"], "vm-1-rootdisk");
        assert_eq!(
            templates[0]["metadata"]["annotations"]["harvesterhci.io/imageId"],
            "default/ubuntu"
        );
        assert_eq!(templates[1]["spec"]["resources"]["requests"]["storage"], "20Gi");
        assert_eq!(templates[1]["spec"]["accessModes"], json!(["ReadWriteMany"]));
    }

    #[test]
    fn boot_order_follows_disk_order() {
        let mut spec = spec();
        spec.disks.reverse();
        let document = spec.render("vm-1", "default").unwrap();
        let disks = &document["spec"]["template"]["spec"]["domain"]["devices"]["disks"];
        assert_eq!(disks[0]["name"], "data");
        assert_eq!(disks[0]["bootOrder"], 1);
        assert_eq!(disks[1]["name"], "rootdisk");
        assert_eq!(disks[1]["bootOrder"], 2);
    }

    #[test]
    fn secure_boot_fans_out() {
        let mut spec = spec();
        spec.set_secure_boot(true);
        assert!(spec.efi_boot());
        let document = spec.render("vm-1", "default").unwrap();
        let domain = &document["spec"]["template"]["spec"]["domain"];
        assert_eq!(domain["features"]["smm"]["enabled"], true);
        assert_eq!(domain["features"]["acpi"]["enabled"], true);
        assert_eq!(domain["firmware"]["bootloader"]["efi"]["secureBoot"], true);

        let mut parsed = VmSpec::from_document(document).unwrap();
        assert!(parsed.secure_boot());
        parsed.set_efi_boot(false);
        assert!(!parsed.secure_boot());
        let document = parsed.render("vm-1", "default").unwrap();
        let domain = &document["spec"]["template"]["spec"]["domain"];
        assert!(domain["features"].get("smm").is_none());
        assert_eq!(domain["features"]["acpi"]["enabled"], true);
        assert!(domain["firmware"].get("bootloader").is_none());
    }

    #[test]
    fn round_trip_preserves_unmodeled_fields() {
        let mut document = spec().render("vm-1", "default").unwrap();
        document["metadata"]["labels"]["team"] = json!("storage");
        document["metadata"]["resourceVersion"] = json!("12345");
        document["spec"]["template"]["spec"]["domain"]["firmware"] = json!({"uuid": "a-b-c"});
        document["spec"]["template"]["spec"]["domain"]["devices"]["disks"][0]["bootOrder"] = json!(1);
        document["status"] = json!({"printableStatus": "Running", "ready": true});

        let rendered = VmSpec::from_document(document.clone())
            .unwrap()
            .render("vm-1", "default")
            .unwrap();
        assert_eq!(rendered, document);
    }

    #[test]
    fn modeled_fields_are_replaced() {
        let document = spec().render("vm-1", "default").unwrap();
        let mut parsed = VmSpec::from_document(document).unwrap();
        assert_eq!(parsed.disks.len(), 2);
        assert!(matches!(&parsed.disks[0].source, DiskSource::New(t) if t.image_id.as_deref() == Some("default/ubuntu")));
        parsed.disks.remove(1);
        parsed.cpu_cores = 4;
        parsed.run_mode = RunMode::Strategy(RunStrategy::Halted);
        parsed.ssh_keys = vec!["default/mykey".to_string()];

        let rendered = parsed.render("vm-1", "default").unwrap();
        assert!(rendered["spec"].get("running").is_none());
        assert_eq!(rendered["spec"]["runStrategy"], "Halted");
        assert_eq!(rendered["spec"]["template"]["spec"]["domain"]["cpu"]["cores"], 4);
        let volumes = rendered["spec"]["template"]["spec"]["volumes"].as_array().unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(
            rendered["spec"]["template"]["metadata"]["annotations"]["harvesterhci.io/sshNames"],
            r#"["default/mykey"]"#
        );
        assert_eq!(
            rendered["spec"]["template"]["metadata"]["labels"]["harvesterhci.io/vmName"],
            "vm-1"
        );
    }

    #[test]
    fn cloud_init_is_recomputed() {
        let mut spec = spec();
        spec.set_guest_agent(true).unwrap();
        let document = spec.render("vm-1", "default").unwrap();
        let mut parsed = VmSpec::from_document(document).unwrap();
        assert!(parsed.guest_agent().unwrap());

        parsed.user_data.clear();
        let document = parsed.render("vm-1", "default").unwrap();
        let spec = &document["spec"]["template"]["spec"];
        assert_eq!(spec["volumes"].as_array().unwrap().len(), 2);
        assert_eq!(spec["domain"]["devices"]["disks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn networks_round_trip() {
        let mut spec = VmSpec::new(1, "1Gi");
        spec.add_network("nic-1", "default/vlan100");
        let mut document = spec.render("vm-2", "default").unwrap();
        document["spec"]["template"]["spec"]["domain"]["devices"]["interfaces"][1]["macAddress"] =
            json!("52:54:00:12:34:56");
        let parsed = VmSpec::from_document(document).unwrap();
        assert_eq!(parsed.networks[0], VmNetwork::pod());
        assert_eq!(
            parsed.networks[1].kind,
            NetworkKind::Multus {
                network_name: "default/vlan100".to_string()
            }
        );
        assert_eq!(parsed.networks[1].mac_address.as_deref(), Some("52:54:00:12:34:56"));
    }

    #[test]
    fn guest_agent_without_cloud_init() {
        let mut spec = VmSpec::new(1, "1Gi");
        assert!(!spec.guest_agent().unwrap());
        spec.set_guest_agent(false).unwrap();
        assert!(!spec.guest_agent().unwrap());
        spec.set_guest_agent(true).unwrap();
        assert!(spec.guest_agent().unwrap());
    }

    fn secret_document() -> Value {
        json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachine",
            "metadata": {"name": "vm-3", "namespace": "default"},
            "spec": {
                "runStrategy": "RerunOnFailure",
                "template": {"spec": {
                    "domain": {"devices": {
                        "disks": [
                            {"name": "rootdisk", "disk": {"bus": "virtio"}, "bootOrder": 1},
                            {"name": "cloudinitdisk", "disk": {"bus": "virtio"}},
                        ],
                    }},
                    "volumes": [
                        {"name": "rootdisk", "persistentVolumeClaim": {"claimName": "vm-3-rootdisk"}},
                        {"name": "cloudinitdisk", "cloudInitNoCloud": {
                            "secretRef": {"name": "vm-3-8x2kq"},
                            "networkDataSecretRef": {"name": "vm-3-8x2kq"},
                        }},
                    ],
                }},
            },
        })
    }

    #[test]
    fn cloud_init_secrets_round_trip() {
        let document = secret_document();
        let parsed = VmSpec::from_document(document.clone()).unwrap();
        assert!(parsed.user_data.is_empty());
        assert_eq!(parsed.user_data_secret.as_deref(), Some("vm-3-8x2kq"));
        assert_eq!(parsed.network_data_secret.as_deref(), Some("vm-3-8x2kq"));

        let rendered = parsed.render("vm-3", "default").unwrap();
        let spec = &rendered["spec"]["template"]["spec"];
        assert_eq!(spec["volumes"], document["spec"]["template"]["spec"]["volumes"]);
        assert_eq!(
            spec["domain"]["devices"]["disks"],
            document["spec"]["template"]["spec"]["domain"]["devices"]["disks"]
        );
    }

    #[test]
    fn inline_user_data_replaces_secret() {
        let mut parsed = VmSpec::from_document(secret_document()).unwrap();
        parsed.user_data = "#cloud-config\npassword: secret\n".to_string();
        let rendered = parsed.render("vm-3", "default").unwrap();
        assert_eq!(
            rendered["spec"]["template"]["spec"]["volumes"][1]["cloudInitNoCloud"],
            json!({
                "userData": "#cloud-config\npassword: secret\n",
                "networkDataSecretRef": {"name": "vm-3-8x2kq"},
            })
        );
    }

    #[test]
    fn unknown_cloud_init_source_is_an_error() {
        let mut document = secret_document();
        document["spec"]["template"]["spec"]["volumes"][1] =
            json!({"name": "cloudinitdisk", "cloudInitConfigDrive": {"userData": "x"}});
        assert!(VmSpec::from_document(document).is_err());
    }

    #[test]
    fn entries_keep_unmodeled_fields() {
        let mut spec = spec();
        spec.add_network("nic-1", "default/vlan100");
        let mut document = spec.render("vm-1", "default").unwrap();
        let template = &mut document["spec"]["template"]["spec"];
        template["domain"]["devices"]["disks"][0]["serial"] = json!("abc123");
        template["domain"]["devices"]["disks"][0]["cache"] = json!("none");
        template["domain"]["devices"]["interfaces"][1]["ports"] = json!([{"port": 22}]);
        template["volumes"][0]["persistentVolumeClaim"]["hotpluggable"] = json!(true);

        let mut parsed = VmSpec::from_document(document).unwrap();
        parsed.disks[0].bus = DiskBus::Scsi;
        parsed.disks[1].kind = DiskKind::Cdrom;
        let rendered = parsed.render("vm-1", "default").unwrap();
        let template = &rendered["spec"]["template"]["spec"];
        let disks = &template["domain"]["devices"]["disks"];
        assert_eq!(
            disks[0],
            json!({"name": "rootdisk", "disk": {"bus": "scsi"}, "bootOrder": 1, "serial": "abc123", "cache": "none"})
        );
        assert_eq!(disks[1], json!({"name": "data", "cdrom": {"bus": "virtio"}, "bootOrder": 2}));
        assert_eq!(
            template["domain"]["devices"]["interfaces"][1]["ports"],
            json!([{"port": 22}])
        );
        assert_eq!(
            template["volumes"][0]["persistentVolumeClaim"],
            json!({"claimName": "vm-1-rootdisk", "hotpluggable": true})
        );
    }

    #[test]
    fn entries_merge_onto_fetched_document() {
        let mut existing = spec().render("vm-1", "default").unwrap();
        existing["spec"]["template"]["spec"]["domain"]["devices"]["disks"][0]["serial"] =
            json!("abc123");
        let mut change = spec();
        change.cpu_cores = 8;
        let merged = change.merge_with(&existing, "vm-1", "default").unwrap();
        let domain = &merged["spec"]["template"]["spec"]["domain"];
        assert_eq!(domain["cpu"]["cores"], 8);
        assert_eq!(domain["devices"]["disks"][0]["serial"], "abc123");
    }

    #[test]
    fn once_run_strategy() {
        let mut document = spec().render("vm-1", "default").unwrap();
        document["spec"]["runStrategy"] = json!("Once");
        let parsed = VmSpec::from_document(document).unwrap();
        assert_eq!(parsed.run_mode, RunMode::Strategy(RunStrategy::Once));
        let rendered = parsed.render("vm-1", "default").unwrap();
        assert_eq!(rendered["spec"]["runStrategy"], "Once");
        assert!(rendered["spec"].get("running").is_none());
    }

    #[test]
    fn unsupported_volume_is_an_error() {
        let document = json!({
            "spec": {"template": {"spec": {
                "domain": {"devices": {"disks": [{"name": "d", "disk": {}}]}},
                "volumes": [{"name": "d", "hostDisk": {"path": "/x"}}],
            }}}
        });
        assert!(VmSpec::from_document(document).is_err());
    }
}
