/*!

This is the command line interface for inspecting and operating a Harvester cluster.

!*/

mod get;
mod setting;
mod version;
mod vm;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Builder;
use harvester_model::{ClientConfig, HarvesterClient, Normalized, Payload};
use log::{debug, LevelFilter};
use std::path::PathBuf;
use url::Url;

/// The command line interface for a Harvester cluster.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to a YAML client configuration file. Flags given on the command line override it.
    #[clap(long = "config")]
    config: Option<PathBuf>,
    /// The URL of the Harvester cluster.
    #[clap(long = "endpoint", env = "HARVESTER_ENDPOINT")]
    endpoint: Option<Url>,
    /// The bearer token to authenticate with.
    #[clap(long = "token", env = "HARVESTER_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// The namespace to work in.
    #[clap(long = "namespace", short = 'n')]
    namespace: Option<String>,
    /// Do not verify the server's TLS certificate.
    #[clap(long = "insecure")]
    insecure: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Print the cluster version and the manager variants selected for it.
    Version(version::Version),
    /// Print a resource, or list them, as YAML.
    Get(get::Get),
    /// Operate a virtual machine.
    Vm(vm::Vm),
    /// Read cluster settings.
    Setting(setting::Setting),
}

fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.client_config()?;
    debug!("connecting to {}", config.endpoint);
    let client = HarvesterClient::connect(&config)
        .context(format!("Unable to connect to '{}'", config.endpoint))?;
    match args.command {
        Command::Version(version) => version.run(&client),
        Command::Get(get) => get.run(&client),
        Command::Vm(vm) => vm.run(&client),
        Command::Setting(setting) => setting.run(&client),
    }
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match (&self.config, &self.endpoint) {
            (Some(path), _) => ClientConfig::from_path(path)
                .context(format!("Unable to load client config from '{:?}'", path))?,
            (None, Some(endpoint)) => ClientConfig::new(endpoint.clone()),
            (None, None) => bail!("Either '--config' or '--endpoint' must be provided"),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if self.insecure {
            config.verify_ssl = false;
        }
        Ok(config)
    }
}

/// Print a successful response as YAML. Any other status is returned as an error carrying the
/// status and whatever the server said.
pub(crate) fn print_response(response: Normalized) -> Result<()> {
    let (status, payload) = response.into_parts();
    let rendered = match &payload {
        Payload::Text(text) => text.clone(),
        other => serde_yaml::to_string(&other.to_value())
            .context("Unable to render the response as YAML")?,
    };
    if !status.is_success() {
        bail!("The server responded with {}\n{}", status, rendered.trim_end());
    }
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate and the library.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("harvester_model"), level)
                .init();
        }
    }
}
