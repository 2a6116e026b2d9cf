use std::net::Ipv4Addr;
use std::path::Path;

use crate::config::DeployConfig;

/// Accumulates engine arguments; options always push flag and value together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineArgs {
    tokens: Vec<String>,
}

impl EngineArgs {
    pub fn subcommand(name: &str) -> Self {
        Self {
            tokens: vec![name.to_string()],
        }
    }

    /// A bare flag such as `-d`.
    pub fn flag(&mut self, flag: &str) -> &mut Self {
        self.tokens.push(flag.to_string());
        self
    }

    /// A flag followed by its value, e.g. `--name app`.
    pub fn option(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.tokens.push(flag.to_string());
        self.tokens.push(value.into());
        self
    }

    /// A `flag left:right` pair, as used by `--add-host` and `--link`.
    pub fn pair(&mut self, flag: &str, left: &str, right: &str) -> &mut Self {
        self.option(flag, format!("{left}:{right}"))
    }

    pub fn positional(&mut self, value: impl Into<String>) -> &mut Self {
        self.tokens.push(value.into());
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tokens
    }
}

/// `docker run` arguments for the configured container.
///
/// `ip` is only used when a network is configured.
pub fn run_args(cfg: &DeployConfig, ip: Option<&str>) -> EngineArgs {
    let port = cfg.server_port.to_string();

    let mut args = EngineArgs::subcommand("run");
    args.flag("-d")
        .option("--name", cfg.project.as_str())
        .pair("-p", &port, &port);

    for entry in &cfg.host_entries {
        args.pair("--add-host", &entry.host, &entry.ip);
    }

    if let Some(network) = &cfg.network {
        args.option("--net", network.as_str());
        if let Some(ip) = ip {
            args.option("--ip", ip);
        }
    }

    for link in &cfg.links {
        args.pair("--link", &link.container, &link.alias);
    }

    args.positional(cfg.image_reference());
    args
}

/// `docker build -t <image> <dir>`.
pub fn build_args(cfg: &DeployConfig, package_dir: &Path) -> EngineArgs {
    let mut args = EngineArgs::subcommand("build");
    args.option("-t", cfg.image_reference())
        .positional(package_dir.to_string_lossy().into_owned());
    args
}

/// `docker rmi <image>`.
pub fn remove_image_args(cfg: &DeployConfig) -> EngineArgs {
    let mut args = EngineArgs::subcommand("rmi");
    args.positional(cfg.image_reference());
    args
}

/// `docker <verb> <id>` for `stop`, `wait`, `rm` and `inspect`.
pub fn container_args(verb: &str, id: &str) -> EngineArgs {
    let mut args = EngineArgs::subcommand(verb);
    args.positional(id);
    args
}

pub fn network_inspect_args(network: &str) -> EngineArgs {
    let mut args = EngineArgs::subcommand("network");
    args.positional("inspect").positional(network);
    args
}

/// Combine a subnet like `172.20.0.0/16` with an address suffix like `5`.
///
/// The non-empty suffix parts become the low-order parts; subnet parts are
/// prepended, most significant first, until there are at most three of them
/// in front. The result is not guaranteed to be a valid IPv4 address: a
/// suffix with four or more parts is returned as is, and a short subnet
/// yields fewer parts.
pub fn ip_for_subnet(subnet: &str, suffix: &str) -> String {
    let base = subnet.rsplit_once('/').map_or(subnet, |(base, _mask)| base);
    let subnet_parts: Vec<&str> = base.split('.').collect();
    let suffix_parts: Vec<&str> = suffix
        .split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let wanted = 3usize.saturating_sub(suffix_parts.len()).saturating_add(1);
    let take = if suffix_parts.len() > 3 {
        0
    } else {
        wanted.min(subnet_parts.len())
    };

    subnet_parts[..take]
        .iter()
        .map(|part| part.trim())
        .chain(suffix_parts)
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether `ip` parses as a dotted-quad IPv4 address.
pub fn is_ipv4(ip: &str) -> bool {
    ip.parse::<Ipv4Addr>().is_ok()
}
