use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::docker::engine::{DEFAULT_ENGINE_BIN, DEFAULT_MACHINE_BIN};

pub const DEFAULT_SERVER_PORT: u16 = 9005;
pub const DEFAULT_PACKAGE_DIR: &str = "build/docker-pkg";
pub const DEFAULT_DOCKERFILE_TEMPLATE: &str = "Dockerfile.template";
pub const DEFAULT_MACHINE: &str = "default";
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// A static `hostname:ip` entry added to the container's hosts file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub host: String,
    pub ip: String,
}

impl HostEntry {
    pub fn new(host: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ip: ip.into(),
        }
    }
}

/// A legacy `--link container:alias` to an existing container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLink {
    pub container: String,
    pub alias: String,
}

impl ContainerLink {
    pub fn new(container: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub group: String,
    /// Defaults to the lowercased project name.
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Everything a deployment needs to know, loaded from `.dockhand.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Project name; also the name given to the running container.
    pub project: String,
    pub image: ImageConfig,
    pub server_port: u16,
    /// Relative paths are resolved against the project directory.
    pub package_dir: PathBuf,
    /// Not read by dockhand; kept for the packaging step that fills `package_dir`.
    pub dockerfile_template: String,
    pub machine: Option<String>,
    pub network: Option<String>,
    pub ip_suffix: Option<String>,
    pub host_entries: Vec<HostEntry>,
    pub links: Vec<ContainerLink>,
    pub engine_bin: String,
    pub machine_bin: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            image: ImageConfig::default(),
            server_port: DEFAULT_SERVER_PORT,
            package_dir: PathBuf::from(DEFAULT_PACKAGE_DIR),
            dockerfile_template: DEFAULT_DOCKERFILE_TEMPLATE.to_string(),
            machine: None,
            network: None,
            ip_suffix: None,
            host_entries: Vec::new(),
            links: Vec::new(),
            engine_bin: DEFAULT_ENGINE_BIN.to_string(),
            machine_bin: DEFAULT_MACHINE_BIN.to_string(),
        }
    }
}

impl DeployConfig {
    pub fn image_group(&self) -> &str {
        &self.image.group
    }

    pub fn image_name(&self) -> String {
        self.image
            .name
            .clone()
            .unwrap_or_else(|| self.project.to_lowercase())
    }

    pub fn image_version(&self) -> &str {
        self.image.version.as_deref().unwrap_or(DEFAULT_IMAGE_VERSION)
    }

    /// `<group>/<name>:`; every tag of this image starts with it.
    pub fn image_prefix(&self) -> String {
        format!("{}/{}:", self.image_group(), self.image_name())
    }

    /// `<group>/<name>:<version>`.
    pub fn image_reference(&self) -> String {
        format!("{}{}", self.image_prefix(), self.image_version())
    }

    pub fn machine_name(&self) -> &str {
        self.machine.as_deref().unwrap_or(DEFAULT_MACHINE)
    }

    pub fn package_dir_in(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.package_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            bail!("`project` must be set");
        }
        if self.image.group.trim().is_empty() {
            bail!("`image.group` must be set");
        }
        if self.server_port == 0 {
            bail!("`server_port` must be a non-zero port");
        }
        Ok(())
    }
}
