use serde_json::Value;
use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::docker::{
    CommandRunner, ContainerQuery, EngineError, EngineHostSession, EngineResult,
    image_prefix_filter,
};
use crate::output::{self, InspectionNode};

use super::commands::{
    build_args, container_args, ip_for_subnet, is_ipv4, network_inspect_args, remove_image_args,
    run_args,
};
use super::types::{DeployError, DeployReport, DeployResult, DeployStep, TeardownSummary};

/// Drives the teardown → remove image → build → run sequence for one project.
///
/// Every operation can also be invoked on its own.
pub struct DeploymentPlanner<'a, R: CommandRunner> {
    session: &'a EngineHostSession<R>,
    config: &'a DeployConfig,
}

impl<'a, R: CommandRunner> DeploymentPlanner<'a, R> {
    pub fn new(session: &'a EngineHostSession<R>, config: &'a DeployConfig) -> Self {
        Self { session, config }
    }

    /// Ids of containers created from any tag of the configured image.
    pub fn matching_containers(&self, all: bool) -> EngineResult<Vec<String>> {
        let filter = image_prefix_filter(&self.config.image_prefix());
        ContainerQuery::new(self.session).list_container_ids_by_image_name(all, Some(&filter))
    }

    /// Stop and wait for the running containers of this image, then remove
    /// every container of this image, stopped ones included.
    ///
    /// A failing container does not stop the sweep; the first failure is
    /// returned once both passes are done. Cancellation aborts immediately.
    pub fn teardown(&self) -> EngineResult<TeardownSummary> {
        let project = self.config.project.as_str();
        let mut summary = TeardownSummary::default();
        let mut first_failure: Option<EngineError> = None;

        for id in self.matching_containers(false)? {
            info!(project, container = %id, "stopping container");
            let stopped = self
                .engine_silent(container_args("stop", &id).as_slice())
                .and_then(|_| self.engine_silent(container_args("wait", &id).as_slice()));
            match stopped {
                Ok(()) => {
                    info!(project, container = %id, "container stopped");
                    summary.stopped.push(id);
                }
                Err(err @ EngineError::InterruptedWait { .. }) => return Err(err),
                Err(err) => {
                    warn!(project, container = %id, error = %err, "failed to stop container");
                    first_failure.get_or_insert(err);
                }
            }
        }

        for id in self.matching_containers(true)? {
            info!(project, container = %id, "removing container");
            match self.engine_silent(container_args("rm", &id).as_slice()) {
                Ok(()) => {
                    info!(project, container = %id, "container removed");
                    summary.removed.push(id);
                }
                Err(err @ EngineError::InterruptedWait { .. }) => return Err(err),
                Err(err) => {
                    warn!(project, container = %id, error = %err, "failed to remove container");
                    first_failure.get_or_insert(err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Remove the configured image tag. A refusal from the engine (image in
    /// use, or already gone) is expected and only logged.
    pub fn remove_image(&self) -> EngineResult<bool> {
        let image = self.config.image_reference();
        match self.session.run_engine(remove_image_args(self.config).as_slice()) {
            Ok(_) => {
                info!(image = %image, "removed image");
                Ok(true)
            }
            Err(err) if err.is_process_failure() => {
                info!(image = %image, error = %err, "image cannot be removed");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Build and tag the image from the package directory.
    pub fn build(&self) -> DeployResult<()> {
        let package_dir = self.config.package_dir_in(self.session.work_dir());
        if !package_dir.is_dir() {
            return Err(DeployError::MissingPackageDir(package_dir));
        }

        let image = self.config.image_reference();
        info!(image = %image, dir = %package_dir.display(), "building image");
        self.session
            .run_engine(build_args(self.config, &package_dir).as_slice())?;
        Ok(())
    }

    /// Fixed container IP on the configured network, if one can be derived.
    ///
    /// Needs both a network and an IP suffix. A missing network or a network
    /// without a subnet is logged and yields `None`.
    pub fn network_ip(&self) -> EngineResult<Option<String>> {
        let (Some(network), Some(suffix)) =
            (self.config.network.as_deref(), self.config.ip_suffix.as_deref())
        else {
            return Ok(None);
        };

        let networks = match self
            .session
            .run_engine_json(network_inspect_args(network).as_slice())
        {
            Ok(networks) => networks,
            Err(err) if err.is_process_failure() => {
                info!(network, error = %err, "docker network not found");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let Some(description) = find_network(&networks, network) else {
            info!(network, "docker network not found");
            return Ok(None);
        };

        let Some(subnet) = first_subnet(description) else {
            info!(network, "docker network has no subnet config");
            return Ok(None);
        };

        let ip = ip_for_subnet(subnet, suffix);
        if !is_ipv4(&ip) {
            warn!(network, subnet, suffix, ip = %ip, "computed container IP is not a valid IPv4 address");
        }
        Ok(Some(ip))
    }

    /// Start the container detached; returns the new container id.
    pub fn run(&self) -> EngineResult<String> {
        let ip = self.network_ip()?;
        let args = run_args(self.config, ip.as_deref());

        info!(
            project = %self.config.project,
            image = %self.config.image_reference(),
            "starting container"
        );
        let output = self.session.run_engine(args.as_slice())?;
        Ok(output.trim().to_string())
    }

    /// Teardown, image removal, build and run, stopping at the first fatal error.
    pub fn deploy(&self) -> DeployResult<DeployReport> {
        announce(DeployStep::Teardown);
        let teardown = self.teardown()?;

        announce(DeployStep::RemoveImage);
        let image_removed = self.remove_image()?;

        announce(DeployStep::Build);
        self.build()?;

        announce(DeployStep::Run);
        let container_id = self.run()?;

        info!(project = %self.config.project, container = %container_id, "deployed");
        Ok(DeployReport {
            teardown,
            image_removed,
            container_id,
        })
    }

    fn engine_silent(&self, args: &[String]) -> EngineResult<()> {
        self.session.run_engine_silent(args).map(|_| ())
    }
}

fn announce(step: DeployStep) {
    info!(step = %step, "deploy step");
}

/// The element of a `docker network inspect` array named exactly `name`.
fn find_network<'n>(networks: &'n InspectionNode, name: &str) -> Option<&'n InspectionNode> {
    networks
        .as_array()?
        .iter()
        .find(|candidate| output::lookup(candidate, &["Name"]).and_then(Value::as_str) == Some(name))
}

/// `IPAM.Config[0].Subnet`.
fn first_subnet(network: &InspectionNode) -> Option<&str> {
    let configs = output::lookup(network, &["IPAM", "Config"])?;
    let first = output::first_element(configs)?;
    output::lookup(first, &["Subnet"])?.as_str()
}
