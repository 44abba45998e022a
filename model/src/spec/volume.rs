use super::{require_object, string_at, SpecModel};
use crate::constants::{ANNOTATION_DESCRIPTION, ANNOTATION_IMAGE_ID};
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use snafu::ResultExt;

const OWNED_PATHS: &[&str] = &[
    "/metadata/annotations/field.cattle.io~1description",
    "/metadata/annotations/harvesterhci.io~1imageId",
    "/spec/accessModes",
    "/spec/resources/requests/storage",
    "/spec/storageClassName",
    "/spec/volumeMode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolumeMode {
    #[default]
    Block,
    Filesystem,
}

serde_plain::derive_display_from_serialize!(VolumeMode);

/// A `PersistentVolumeClaim` as Harvester creates them for virtual machine volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpec {
    /// A Kubernetes quantity, e.g. `10Gi`.
    pub size: String,
    pub storage_class: Option<String>,
    /// `None` leaves the mode to the cluster, which defaults to `Filesystem`.
    pub volume_mode: Option<VolumeMode>,
    /// Left out of the document when empty.
    pub access_modes: Vec<String>,
    /// `{namespace}/{name}` of the image the volume is populated from.
    pub image_id: Option<String>,
    pub description: String,
    backing: Option<Value>,
}

impl VolumeSpec {
    pub fn new<S>(size: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            size: size.into(),
            storage_class: None,
            volume_mode: Some(VolumeMode::default()),
            access_modes: vec!["ReadWriteMany".to_string()],
            image_id: None,
            description: String::new(),
            backing: None,
        }
    }

    /// A volume populated from an image. Harvester creates one storage class per image, named
    /// `longhorn-{image name}`, which is used unless `storage_class` is set.
    pub fn from_image<S, I>(size: S, image_id: I) -> Self
    where
        S: Into<String>,
        I: Into<String>,
    {
        let mut spec = Self::new(size);
        spec.image_id = Some(image_id.into());
        spec
    }

    fn effective_storage_class(&self) -> Option<String> {
        self.storage_class.clone().or_else(|| {
            self.image_id.as_ref().map(|image_id| {
                let image_name = image_id.rsplit('/').next().unwrap_or(image_id);
                format!("longhorn-{}", image_name)
            })
        })
    }
}

impl SpecModel for VolumeSpec {
    fn owned_paths(&self) -> &'static [&'static str] {
        OWNED_PATHS
    }

    fn to_delta(&self, name: &str, namespace: &str) -> Result<Value> {
        let mut annotations = Map::new();
        if !self.description.is_empty() {
            annotations.insert(ANNOTATION_DESCRIPTION.into(), json!(self.description));
        }
        if let Some(image_id) = &self.image_id {
            annotations.insert(ANNOTATION_IMAGE_ID.into(), json!(image_id));
        }
        let mut spec = json!({"resources": {"requests": {"storage": self.size}}});
        if !self.access_modes.is_empty() {
            spec["accessModes"] = json!(self.access_modes);
        }
        if let Some(volume_mode) = self.volume_mode {
            spec["volumeMode"] = json!(volume_mode);
        }
        if let Some(storage_class) = self.effective_storage_class() {
            spec["storageClassName"] = json!(storage_class);
        }
        let mut metadata = json!({"name": name, "namespace": namespace});
        if !annotations.is_empty() {
            metadata["annotations"] = Value::Object(annotations);
        }
        Ok(json!({"metadata": metadata, "spec": spec}))
    }

    fn scaffold(&self, name: &str, namespace: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": {"name": name, "namespace": namespace},
        })
    }

    fn from_document(document: Value) -> Result<Self> {
        require_object(&document, "persistent volume claim")?;
        let volume_mode = match document.pointer("/spec/volumeMode") {
            Some(mode) => Some(
                serde_json::from_value(mode.clone())
                    .context(error::SerdeSnafu { what: "volumeMode" })?,
            ),
            None => None,
        };
        let access_modes = match document.pointer("/spec/accessModes") {
            Some(modes) => serde_json::from_value(modes.clone())
                .context(error::SerdeSnafu { what: "accessModes" })?,
            None => Vec::new(),
        };
        Ok(Self {
            size: string_at(&document, "/spec/resources/requests/storage").unwrap_or_default(),
            storage_class: string_at(&document, "/spec/storageClassName"),
            volume_mode,
            access_modes,
            image_id: string_at(&document, "/metadata/annotations/harvesterhci.io~1imageId"),
            description: string_at(
                &document,
                "/metadata/annotations/field.cattle.io~1description",
            )
            .unwrap_or_default(),
            backing: Some(document),
        })
    }

    fn backing(&self) -> Option<&Value> {
        self.backing.as_ref()
    }
}
