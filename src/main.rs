use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use dockhand::config::{self, DeployConfig};
use dockhand::docker::{CancelToken, EngineHostSession, EnvSnapshot, SessionSettings};
use dockhand::logging;
use dockhand::pipeline::DeploymentPlanner;

#[derive(Parser)]
#[command(name = "dockhand", version, about = "Deploy a packaged service as a container on a docker-machine host")]
struct Cli {
    /// Project directory; commands run here and the package dir is resolved against it
    #[arg(short = 'C', long, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (default: <project-dir>/.dockhand.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the machine if needed and print its IP
    Status,
    /// Print the machine's environment as export lines
    Env,
    /// List containers created from the configured image
    Containers {
        /// Include stopped containers
        #[arg(long)]
        all: bool,
    },
    /// Stop and remove every container of the configured image
    Teardown,
    /// Remove the configured image tag
    RemoveImage,
    /// Build the image from the package directory
    Build,
    /// Start a new container
    Run,
    /// Teardown, remove image, build and run
    Deploy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let base_env = EnvSnapshot::from_process();
    let project_dir = cli
        .project_dir
        .canonicalize()
        .with_context(|| format!("project directory {} not found", cli.project_dir.display()))?;

    let cfg = config::load(&project_dir, cli.config.as_deref(), &base_env)?;
    cfg.validate().context("invalid deploy config")?;
    debug!(project = %cfg.project, image = %cfg.image_reference(), "loaded config");

    let session = EngineHostSession::with_process_runners(settings(&cfg, project_dir, base_env), CancelToken::new());
    let planner = DeploymentPlanner::new(&session, &cfg);

    match cli.command {
        Commands::Status => {
            println!("{}", session.host_ip()?);
        }
        Commands::Env => {
            for (key, value) in session.extra_env()?.iter() {
                println!("export {key}=\"{value}\"");
            }
        }
        Commands::Containers { all } => {
            for id in planner.matching_containers(all)? {
                println!("{id}");
            }
        }
        Commands::Teardown => {
            let summary = planner.teardown()?;
            eprintln!(
                "stopped {} and removed {} container(s) of {}",
                summary.stopped.len(),
                summary.removed.len(),
                cfg.image_prefix()
            );
        }
        Commands::RemoveImage => {
            if !planner.remove_image()? {
                eprintln!("image {} was not removed", cfg.image_reference());
            }
        }
        Commands::Build => planner.build()?,
        // `docker run -d` already echoed the container id on stdout.
        Commands::Run => {
            let id = planner.run()?;
            info!(container = %id, "container started");
        }
        Commands::Deploy => {
            planner.deploy()?;
        }
    }

    Ok(())
}

fn settings(cfg: &DeployConfig, project_dir: PathBuf, base_env: EnvSnapshot) -> SessionSettings {
    let mut settings = SessionSettings::new(cfg.machine_name(), project_dir, base_env);
    settings.engine_bin = cfg.engine_bin.clone();
    settings.machine_bin = cfg.machine_bin.clone();
    settings
}
