use crate::print_response;
use anyhow::{Context, Result};
use clap::Parser;
use harvester_model::HarvesterClient;

/// Operate a virtual machine in the selected namespace.
#[derive(Debug, Parser)]
pub(crate) struct Vm {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Start a stopped virtual machine.
    Start { name: String },
    /// Stop a running virtual machine.
    Stop { name: String },
    /// Restart a virtual machine.
    Restart { name: String },
    /// Pause a running virtual machine.
    Pause { name: String },
    /// Resume a paused virtual machine.
    Unpause { name: String },
    /// Reboot a virtual machine through its guest agent.
    Softreboot { name: String },
    /// Live-migrate a virtual machine to another host.
    Migrate {
        name: String,
        /// The host to migrate to.
        node: String,
    },
    /// Abort an ongoing migration.
    AbortMigrate { name: String },
}

impl Vm {
    pub(crate) fn run(self, client: &HarvesterClient) -> Result<()> {
        let vms = client.virtual_machines();
        let namespace = client.namespace();
        let (verb, response) = match &self.command {
            Command::Start { name } => ("start", vms.start(name, namespace)),
            Command::Stop { name } => ("stop", vms.stop(name, namespace)),
            Command::Restart { name } => ("restart", vms.restart(name, namespace)),
            Command::Pause { name } => ("pause", vms.pause(name, namespace)),
            Command::Unpause { name } => ("unpause", vms.unpause(name, namespace)),
            Command::Softreboot { name } => ("softreboot", vms.softreboot(name, namespace)),
            Command::Migrate { name, node } => ("migrate", vms.migrate(name, namespace, node)),
            Command::AbortMigrate { name } => {
                ("abort the migration of", vms.abort_migrate(name, namespace))
            }
        };
        let response = response.context(format!("Unable to {} the virtual machine", verb))?;
        print_response(response)
    }
}
