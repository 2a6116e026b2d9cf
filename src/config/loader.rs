use std::path::Path;

use anyhow::{Context, Result};

use super::types::DeployConfig;
use crate::docker::EnvSnapshot;

pub const CONFIG_FILE_NAME: &str = ".dockhand.yml";
pub const MACHINE_ENV_VAR: &str = "DOCKHAND_MACHINE";
pub const NETWORK_ENV_VAR: &str = "DOCKHAND_NETWORK";

/// Load the deploy config for `project_dir`.
///
/// Reads `explicit` when given (it must exist), otherwise `.dockhand.yml` in
/// the project directory, falling back to defaults when that file is absent.
/// Environment overrides from `env` are applied afterwards.
pub fn load(project_dir: &Path, explicit: Option<&Path>, env: &EnvSnapshot) -> Result<DeployConfig> {
    let mut config = match explicit {
        Some(path) => read(path)?,
        None => {
            let path = project_dir.join(CONFIG_FILE_NAME);
            if path.exists() { read(&path)? } else { DeployConfig::default() }
        }
    };
    apply_env_overrides(&mut config, env);
    Ok(config)
}

fn read(path: &Path) -> Result<DeployConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
}

/// Fill `machine` and `network` from the environment when the file left them unset.
pub fn apply_env_overrides(config: &mut DeployConfig, env: &EnvSnapshot) {
    if config.machine.is_none() {
        config.machine = non_empty(env.get(MACHINE_ENV_VAR));
    }
    if config.network.is_none() {
        config.network = non_empty(env.get(NETWORK_ENV_VAR));
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
