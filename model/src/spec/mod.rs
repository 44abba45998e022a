/*!

Builders that translate between an ergonomic object model and the nested documents the server
expects.

A `SpecModel` serializes only what it models (its "delta") and lays that delta over a base
document: its own backing document when it was parsed from one, a freshly fetched document when
updating, or a minimal scaffold when creating. Every JSON pointer the spec owns is cleared from the
base first, so a field the spec turned off really disappears, while every field the spec knows
nothing about survives.

!*/

mod backup_target;
mod cloud_init;
mod image;
mod vm;
mod volume;

pub use backup_target::{BackupTarget, BackupTargetSpec};
pub use image::{ImageSourceType, ImageSpec};
pub use vm::{
    ClaimTemplate, DiskBus, DiskKind, DiskSource, NetworkKind, RunMode, RunStrategy, VmDisk,
    VmNetwork, VmSpec,
};
pub use volume::{VolumeMode, VolumeSpec};

use crate::error::{self, Result};
use crate::merge::merge;
use crate::patch::remove_pointers;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use snafu::{OptionExt, ResultExt};

/// The contract implemented by every resource builder.
pub trait SpecModel: Sized {
    /// JSON pointers whose content this spec fully controls. They are removed from the base
    /// document before the delta is merged in.
    fn owned_paths(&self) -> &'static [&'static str];

    /// Serialize the modeled fields, and only those.
    fn to_delta(&self, name: &str, namespace: &str) -> Result<Value>;

    /// The minimal document a new resource starts from.
    fn scaffold(&self, name: &str, namespace: &str) -> Value {
        json!({"metadata": {"name": name, "namespace": namespace}})
    }

    /// Parse the modeled fields of `document`, keeping `document` as the backing document.
    fn from_document(document: Value) -> Result<Self>;

    /// The document this spec was parsed from, if any.
    fn backing(&self) -> Option<&Value>;

    /// Lay the delta over `base`. Specs that keep per-entry fields of `base` alive override this.
    fn overlay_onto(&self, base: &Value, name: &str, namespace: &str) -> Result<Value> {
        overlay(base, self.to_delta(name, namespace)?, self.owned_paths())
    }

    /// The full document for this spec: the delta laid over the backing document, or over the
    /// scaffold if there is none.
    fn render(&self, name: &str, namespace: &str) -> Result<Value> {
        match self.backing() {
            Some(backing) => self.overlay_onto(backing, name, namespace),
            None => self.overlay_onto(&self.scaffold(name, namespace), name, namespace),
        }
    }
}

/// Anything a manager can send as a create or update body.
pub trait Serializable {
    /// The complete document to create.
    fn to_document(&self, name: &str, namespace: &str) -> Result<Value>;

    /// The complete document to send back after combining with `existing`, the server's current
    /// representation.
    fn merge_with(&self, existing: &Value, name: &str, namespace: &str) -> Result<Value>;
}

impl<T> Serializable for T
where
    T: SpecModel,
{
    fn to_document(&self, name: &str, namespace: &str) -> Result<Value> {
        self.render(name, namespace)
    }

    fn merge_with(&self, existing: &Value, name: &str, namespace: &str) -> Result<Value> {
        self.overlay_onto(existing, name, namespace)
    }
}

/// A plain document passed straight through. Updating with it deep-merges it onto the existing
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument(pub Value);

impl From<Value> for RawDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Serializable for RawDocument {
    fn to_document(&self, _name: &str, _namespace: &str) -> Result<Value> {
        Ok(self.0.clone())
    }

    fn merge_with(&self, existing: &Value, _name: &str, _namespace: &str) -> Result<Value> {
        let mut document = existing.clone();
        merge(&self.0, &mut document);
        Ok(document)
    }
}

/// Clear `owned` from a copy of `base` and merge `delta` onto it.
pub fn overlay(base: &Value, delta: Value, owned: &[&str]) -> Result<Value> {
    let mut document = base.clone();
    remove_pointers(&mut document, owned)?;
    merge(&delta, &mut document);
    Ok(document)
}

/// How the entries of a list keyed by `name` are laid over the entries of the same list in a
/// base document.
pub(crate) struct NamedList {
    pub pointer: &'static str,
    /// Cleared from the base entry before the new entry is merged onto it.
    pub owned: &'static [&'static str],
    /// Keys of which an entry carries at most one, e.g. the source of a volume. Any of them the
    /// new entry does not carry is cleared from the base entry.
    pub exclusive: &'static [&'static str],
}

impl NamedList {
    /// Replace the list in `delta` with its entries laid over the matching entries of `base`.
    /// Entries `base` does not have are kept as they are, and base entries no longer listed are
    /// dropped.
    pub(crate) fn overlay_entries(&self, base: &Value, delta: &mut Value) -> Result<()> {
        let existing = array_at(base, self.pointer);
        if existing.is_empty() {
            return Ok(());
        }
        if let Some(Value::Array(entries)) = delta.pointer_mut(self.pointer) {
            let computed = std::mem::take(entries);
            *entries = computed
                .into_iter()
                .map(|entry| self.overlay_entry(existing, entry))
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(())
    }

    fn overlay_entry(&self, existing: &[Value], entry: Value) -> Result<Value> {
        let base = str_at(&entry, "/name").and_then(|name| {
            existing
                .iter()
                .find(|candidate| str_at(candidate, "/name") == Some(name))
        });
        let base = match base {
            Some(base) => base,
            None => return Ok(entry),
        };
        let cleared: Vec<String> = self
            .owned
            .iter()
            .map(|pointer| pointer.to_string())
            .chain(
                self.exclusive
                    .iter()
                    .filter(|key| entry.get(**key).is_none())
                    .map(|key| format!("/{}", key)),
            )
            .collect();
        overlay(base, entry, &cleared.iter().map(String::as_str).collect::<Vec<_>>())
    }
}

// Helpers for reading documents. Missing paths are `None`; a document's shape is only enforced
// where a spec genuinely cannot work without it.

pub(crate) fn str_at<'a>(document: &'a Value, pointer: &str) -> Option<&'a str> {
    document.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn string_at(document: &Value, pointer: &str) -> Option<String> {
    str_at(document, pointer).map(str::to_string)
}

pub(crate) fn array_at<'a>(document: &'a Value, pointer: &str) -> &'a [Value] {
    document
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Deserialize the JSON document embedded as a string at `pointer`, e.g. an annotation.
pub(crate) fn embedded_json_at<T>(document: &Value, pointer: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match str_at(document, pointer) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => serde_json::from_str(s)
            .map(Some)
            .context(error::SerdeSnafu { what: pointer }),
    }
}

pub(crate) fn require_object<'a>(document: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    document.as_object().context(error::DocumentSnafu {
        what: format!("{} is not an object", what),
    })
}
