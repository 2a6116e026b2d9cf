mod loader;
mod types;

pub use loader::{CONFIG_FILE_NAME, MACHINE_ENV_VAR, NETWORK_ENV_VAR, apply_env_overrides, load};
pub use types::{
    ContainerLink, DEFAULT_DOCKERFILE_TEMPLATE, DEFAULT_MACHINE, DEFAULT_PACKAGE_DIR,
    DEFAULT_SERVER_PORT, DeployConfig, HostEntry, ImageConfig,
};
