use crate::constants::{CLOUD_CONFIG_HEADER, GUEST_AGENT_PACKAGE};
use crate::error::{self, Result};
use serde_yaml::{Mapping, Value};
use snafu::ResultExt;

const PACKAGES: &str = "packages";
const RUNCMD: &str = "runcmd";

fn enable_guest_agent_command() -> Value {
    Value::Sequence(
        ["systemctl", "enable", "--now", "qemu-guest-agent.service"]
            .iter()
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}

/// True when `user_data` holds nothing but blank lines and comments, such as a bare
/// `#cloud-config` header. The YAML parser rejects such input instead of reading it as empty.
fn is_blank(user_data: &str) -> bool {
    user_data.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn parse(user_data: &str) -> Result<Mapping> {
    if is_blank(user_data) {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_str(user_data).context(error::YamlSnafu {
        what: "cloud-init user data",
    })?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => error::DocumentSnafu {
            what: "cloud-init user data is not a YAML mapping",
        }
        .fail(),
    }
}

fn sequence<'a>(config: &'a Mapping, key: &str) -> &'a [Value] {
    config
        .get(&Value::String(key.to_string()))
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Whether `user_data` installs and starts the QEMU guest agent.
pub(super) fn has_guest_agent(user_data: &str) -> Result<bool> {
    let config = parse(user_data)?;
    let package = Value::String(GUEST_AGENT_PACKAGE.to_string());
    Ok(sequence(&config, PACKAGES).contains(&package)
        && sequence(&config, RUNCMD).contains(&enable_guest_agent_command()))
}

/// Rewrite `user_data` so that it does (or does not) install and start the QEMU guest agent.
/// Other keys are preserved, though comments other than the `#cloud-config` header are not.
pub(super) fn set_guest_agent(user_data: &str, enabled: bool) -> Result<String> {
    let mut config = parse(user_data)?;
    let package = Value::String(GUEST_AGENT_PACKAGE.to_string());
    let command = enable_guest_agent_command();
    for (key, item) in [(PACKAGES, package), (RUNCMD, command)] {
        let key = Value::String(key.to_string());
        let mut items = config
            .get(&key)
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();
        items.retain(|existing| *existing != item);
        if enabled {
            items.push(item);
        }
        if items.is_empty() {
            config.remove(&key);
        } else {
            config.insert(key, Value::Sequence(items));
        }
    }
    render(&config)
}

fn render(config: &Mapping) -> Result<String> {
    if config.is_empty() {
        return Ok(format!("{}\n", CLOUD_CONFIG_HEADER));
    }
    let yaml = serde_yaml::to_string(config).context(error::YamlSnafu {
        what: "cloud-init user data",
    })?;
    let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
    Ok(format!("{}\n{}", CLOUD_CONFIG_HEADER, yaml))
}
