use anyhow::Result;
use clap::Parser;
use harvester_model::HarvesterClient;

/// Print the cluster version and the manager variants selected for it.
#[derive(Debug, Parser)]
pub(crate) struct Version {}

impl Version {
    pub(crate) fn run(self, client: &HarvesterClient) -> Result<()> {
        println!("endpoint: {}", client.endpoint());
        println!("version: {}", client.cluster_version());
        println!("managers:");
        for (kind, variant) in client.variants() {
            println!("  {}: {}", kind, variant);
        }
        Ok(())
    }
}
