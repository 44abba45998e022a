/*!

A client for the Harvester HCI API.

`HarvesterClient` owns the HTTP session and one manager per kind of resource. Managers are chosen
for the version the cluster reports through a `ManagerRegistry`, so the same call serializes the
way the cluster expects without the caller knowing which version it talks to. Every request
collapses into a `Normalized` `(status, payload)` pair, and updates merge the caller's changes onto
the server's current document so fields the client does not model survive.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use clients::{
    Body, Delegate, HttpResponse, HttpStatusCode, Normalized, Payload, RequestArgs,
    RequestDelegate, SessionHandle, StatusCode, Transport,
};
pub use config::{ClientConfig, RetryConfig};
pub use error::{Error, Result};
pub use harvester::HarvesterClient;
pub use managers::UpdatePolicy;
pub use registry::{Manager, ManagerRegistry};
pub use spec::{RawDocument, Serializable, SpecModel};
pub use version::ClusterVersion;

pub mod clients;
mod config;
pub mod constants;
mod error;
mod harvester;
pub mod managers;
pub mod merge;
pub mod patch;
pub mod path;
pub mod registry;
pub mod spec;
mod version;
