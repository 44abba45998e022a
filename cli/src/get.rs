use crate::print_response;
use anyhow::{Context, Result};
use clap::Parser;
use harvester_model::HarvesterClient;
use serde::Deserialize;
use serde_plain::derive_fromstr_from_deserialize;

/// Print a resource, or list them, as YAML.
#[derive(Debug, Parser)]
pub(crate) struct Get {
    /// The kind of resource: hosts, images, keypairs, settings, vms, volumes or backups.
    kind: Kind,

    /// The name of the resource. Without it, every resource of the kind is listed.
    name: Option<String>,

    /// List resources in every namespace instead of the selected one.
    #[clap(long = "all-namespaces", short = 'A')]
    all_namespaces: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Kind {
    Hosts,
    Images,
    Keypairs,
    Settings,
    Vms,
    Volumes,
    Backups,
}

derive_fromstr_from_deserialize!(Kind);

impl Get {
    pub(crate) fn run(self, client: &HarvesterClient) -> Result<()> {
        let namespace = client.namespace();
        let scope = if self.all_namespaces {
            None
        } else {
            Some(namespace)
        };
        let response = match (self.kind, self.name.as_deref()) {
            (Kind::Hosts, Some(name)) => client.hosts().get(name),
            (Kind::Hosts, None) => client.hosts().list(),
            (Kind::Images, Some(name)) => client.images().get(name, namespace),
            (Kind::Images, None) => client.images().list(scope),
            (Kind::Keypairs, Some(name)) => client.keypairs().get(name, namespace),
            (Kind::Keypairs, None) => client.keypairs().list(scope),
            (Kind::Settings, Some(name)) => client.settings().get(name),
            (Kind::Settings, None) => client.settings().list(),
            (Kind::Vms, Some(name)) => client.virtual_machines().get(name, namespace),
            (Kind::Vms, None) => client.virtual_machines().list(scope),
            (Kind::Volumes, Some(name)) => client.volumes().get(name, namespace),
            (Kind::Volumes, None) => client.volumes().list(scope),
            (Kind::Backups, Some(name)) => client.backups().get(name, namespace),
            (Kind::Backups, None) => client.backups().list(scope),
        }
        .context(format!("Unable to get {:?}", self.kind))?;
        print_response(response)
    }
}
