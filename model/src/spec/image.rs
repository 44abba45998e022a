use super::{require_object, string_at, SpecModel};
use crate::constants::{ANNOTATION_DESCRIPTION, ANNOTATION_STORAGE_CLASS, HARVESTER_API_VERSION};
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use snafu::ResultExt;

const OWNED_PATHS: &[&str] = &[
    "/metadata/annotations/field.cattle.io~1description",
    "/metadata/annotations/harvesterhci.io~1storageClassName",
    "/spec/checksum",
    "/spec/displayName",
    "/spec/sourceType",
    "/spec/url",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageSourceType {
    Download,
    Upload,
    ExportFromVolume,
}

serde_plain::derive_display_from_serialize!(ImageSourceType);

/// A `VirtualMachineImage`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    pub display_name: String,
    pub source_type: ImageSourceType,
    /// Where a `download` image is fetched from.
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub description: String,
    pub storage_class: Option<String>,
    backing: Option<Value>,
}

impl ImageSpec {
    pub fn download<N, U>(display_name: N, url: U) -> Self
    where
        N: Into<String>,
        U: Into<String>,
    {
        Self {
            url: Some(url.into()),
            ..Self::new(display_name, ImageSourceType::Download)
        }
    }

    pub fn upload<N>(display_name: N) -> Self
    where
        N: Into<String>,
    {
        Self::new(display_name, ImageSourceType::Upload)
    }

    fn new<N>(display_name: N, source_type: ImageSourceType) -> Self
    where
        N: Into<String>,
    {
        Self {
            display_name: display_name.into(),
            source_type,
            url: None,
            checksum: None,
            description: String::new(),
            storage_class: None,
            backing: None,
        }
    }
}

impl SpecModel for ImageSpec {
    fn owned_paths(&self) -> &'static [&'static str] {
        OWNED_PATHS
    }

    fn to_delta(&self, name: &str, namespace: &str) -> Result<Value> {
        let mut annotations = Map::new();
        if !self.description.is_empty() {
            annotations.insert(ANNOTATION_DESCRIPTION.into(), json!(self.description));
        }
        if let Some(storage_class) = &self.storage_class {
            annotations.insert(ANNOTATION_STORAGE_CLASS.into(), json!(storage_class));
        }
        let mut spec = json!({"displayName": self.display_name, "sourceType": self.source_type});
        if let Some(url) = &self.url {
            spec["url"] = json!(url);
        }
        if let Some(checksum) = &self.checksum {
            spec["checksum"] = json!(checksum);
        }
        Ok(json!({
            "metadata": {"name": name, "namespace": namespace, "annotations": annotations},
            "spec": spec,
        }))
    }

    fn scaffold(&self, name: &str, namespace: &str) -> Value {
        json!({
            "apiVersion": HARVESTER_API_VERSION,
            "kind": "VirtualMachineImage",
            "metadata": {"name": name, "namespace": namespace},
        })
    }

    fn from_document(document: Value) -> Result<Self> {
        require_object(&document, "virtual machine image")?;
        let source_type = match document.pointer("/spec/sourceType") {
            Some(source_type) => serde_json::from_value(source_type.clone())
                .context(error::SerdeSnafu { what: "sourceType" })?,
            None => ImageSourceType::Download,
        };
        Ok(Self {
            display_name: string_at(&document, "/spec/displayName").unwrap_or_default(),
            source_type,
            url: string_at(&document, "/spec/url"),
            checksum: string_at(&document, "/spec/checksum"),
            description: string_at(
                &document,
                "/metadata/annotations/field.cattle.io~1description",
            )
            .unwrap_or_default(),
            storage_class: string_at(
                &document,
                "/metadata/annotations/harvesterhci.io~1storageClassName",
            ),
            backing: Some(document),
        })
    }

    fn backing(&self) -> Option<&Value> {
        self.backing.as_ref()
    }
}
