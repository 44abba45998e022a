use crate::print_response;
use anyhow::{Context, Result};
use clap::Parser;
use harvester_model::spec::BackupTarget;
use harvester_model::HarvesterClient;

/// Read cluster settings.
#[derive(Debug, Parser)]
pub(crate) struct Setting {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Print a setting as YAML.
    Get { name: String },
    /// Print the configured backup target.
    BackupTarget,
}

impl Setting {
    pub(crate) fn run(self, client: &HarvesterClient) -> Result<()> {
        match self.command {
            Command::Get { name } => {
                let response = client
                    .settings()
                    .get(&name)
                    .context(format!("Unable to get setting '{}'", name))?;
                print_response(response)
            }
            Command::BackupTarget => {
                let spec = client
                    .settings()
                    .backup_target()
                    .context("Unable to get the backup target")?;
                match &spec.target {
                    None => println!("backups are disabled"),
                    Some(BackupTarget::Nfs { endpoint }) => println!("nfs: {}", endpoint),
                    Some(BackupTarget::S3 {
                        endpoint,
                        bucket_name,
                        bucket_region,
                        ..
                    }) => {
                        let endpoint = if endpoint.is_empty() { "aws" } else { endpoint };
                        println!("s3: {}/{} ({})", endpoint, bucket_name, bucket_region)
                    }
                }
                Ok(())
            }
        }
    }
}
