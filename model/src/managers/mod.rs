/*!

One manager per kind of resource. Every manager is a thin layer over a `Delegate`: it knows where
its resources live, which verbs the server accepts for them, and how to turn a spec into the
document the server expects.

Functions that send a request return the `Normalized` response. An HTTP error status is not an
`Err`; callers branch on the status themselves.

!*/

mod backups;
mod hosts;
mod images;
mod keypairs;
mod settings;
mod virtual_machines;
mod volumes;

pub use backups::{BackupManager, Restore};
pub use hosts::HostManager;
pub use images::ImageManager;
pub use keypairs::KeypairManager;
pub use settings::SettingManager;
pub use virtual_machines::{VirtualMachineManager, VM_RUN_STRATEGY_VARIANT};
pub use volumes::VolumeManager;

use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate};
use crate::error::{self, Result};
use crate::patch::remove_pointers;
use crate::spec::Serializable;
use log::debug;
use serde_json::Value;

/// What an update does with the `resourceVersion` of the document it fetched.
///
/// Every update fetches the current document, merges the caller's changes onto it, and sends the
/// whole result back. Any change another writer makes between the fetch and the write is either
/// detected or lost, depending on the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Send the fetched `resourceVersion` back. A concurrent write makes the server answer
    /// `409 Conflict`, and the caller should fetch, merge and try again.
    #[default]
    Optimistic,
    /// Strip `resourceVersion` so the write always wins.
    Overwrite,
}

pub(crate) fn disallowed<T>(operation: &str, resource: &str) -> Result<T> {
    error::DisallowedSnafu {
        operation,
        resource,
    }
    .fail()
}

/// Fetch the document at `path`, merge `data` onto it and `PUT` the result. A failed fetch is
/// returned as is, without attempting the write.
pub(crate) fn merge_update<D>(
    delegate: &Delegate,
    path: &str,
    name: &str,
    namespace: &str,
    data: &D,
    policy: UpdatePolicy,
) -> Result<Normalized>
where
    D: Serializable + ?Sized,
{
    let current = delegate.get(path, RequestArgs::new())?;
    let existing = match (current.is_success(), current.json()) {
        (true, Some(existing)) => existing,
        _ => return Ok(current),
    };
    let mut document = data.merge_with(existing, name, namespace)?;
    if policy == UpdatePolicy::Overwrite {
        debug!("overwriting {} '{}' regardless of its resourceVersion", delegate.kind(), name);
        remove_pointers(&mut document, &["/metadata/resourceVersion"])?;
    }
    delegate.update(path, &document, RequestArgs::new())
}

/// `POST` the document rendered from `data` to `collection`.
pub(crate) fn create_from<D>(
    delegate: &Delegate,
    collection: &str,
    name: &str,
    namespace: &str,
    data: &D,
) -> Result<Normalized>
where
    D: Serializable + ?Sized,
{
    let document = data.to_document(name, namespace)?;
    delegate.create(collection, RequestArgs::new().json(document))
}

/// `POST ?action={verb}` with an optional JSON body.
pub(crate) fn action(
    delegate: &Delegate,
    path: &str,
    verb: &str,
    body: Option<Value>,
) -> Result<Normalized> {
    let args = RequestArgs::new().action(verb);
    let args = match body {
        Some(body) => args.json(body),
        None => args,
    };
    delegate.create(path, args)
}
