use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::output::{self, InspectionNode};

use super::error::EngineResult;
use super::run::{CommandRunner, ProcessRunner};
use super::types::{CancelToken, CommandSpec, EnvSnapshot};

pub const DEFAULT_ENGINE_BIN: &str = "docker";
pub const DEFAULT_MACHINE_BIN: &str = "docker-machine";

/// Static inputs of a session: which host, which binaries, which directory,
/// and the environment the session starts from.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub machine: String,
    pub engine_bin: String,
    pub machine_bin: String,
    pub work_dir: PathBuf,
    pub base_env: EnvSnapshot,
}

impl SessionSettings {
    pub fn new(machine: impl Into<String>, work_dir: impl Into<PathBuf>, base_env: EnvSnapshot) -> Self {
        Self {
            machine: machine.into(),
            engine_bin: DEFAULT_ENGINE_BIN.to_string(),
            machine_bin: DEFAULT_MACHINE_BIN.to_string(),
            work_dir: work_dir.into(),
            base_env,
        }
    }
}

/// A lazily started machine plus the engine commands that run against it.
///
/// The machine is checked (and started if stopped) on first use. The host IP
/// and the environment derived from `docker-machine env` are computed at most
/// once per session; concurrent first callers wait for the one computation.
pub struct EngineHostSession<R: CommandRunner = ProcessRunner> {
    settings: SessionSettings,
    loud: R,
    silent: R,
    started: OnceCell<()>,
    host_ip: OnceCell<String>,
    extra_env: OnceCell<EnvSnapshot>,
    merged_env: OnceCell<EnvSnapshot>,
}

impl EngineHostSession<ProcessRunner> {
    /// Session backed by real processes; both runners share `cancel`.
    pub fn with_process_runners(settings: SessionSettings, cancel: CancelToken) -> Self {
        Self::new(
            settings,
            ProcessRunner::mirroring(cancel.clone()),
            ProcessRunner::silent(cancel),
        )
    }
}

impl<R: CommandRunner> EngineHostSession<R> {
    /// `loud` mirrors child output live, `silent` only captures it.
    pub fn new(settings: SessionSettings, loud: R, silent: R) -> Self {
        Self {
            settings,
            loud,
            silent,
            started: OnceCell::new(),
            host_ip: OnceCell::new(),
            extra_env: OnceCell::new(),
            merged_env: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn machine(&self) -> &str {
        &self.settings.machine
    }

    pub fn work_dir(&self) -> &Path {
        &self.settings.work_dir
    }

    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    /// Make sure the machine is running, starting it when its status says
    /// it is stopped. Runs the status check once per session.
    pub fn ensure_started(&self) -> EngineResult<()> {
        self.started
            .get_or_try_init(|| {
                let status = self.machine_command_unchecked(&["status"])?;
                if status.trim().to_lowercase().contains("stop") {
                    info!(machine = %self.settings.machine, "starting docker machine");
                    self.machine_command_unchecked(&["start"])?;
                    info!(machine = %self.settings.machine, "started docker machine");
                } else {
                    debug!(machine = %self.settings.machine, status = %status.trim(), "docker machine already running");
                }
                Ok(())
            })
            .map(|_| ())
    }

    /// IP address of the machine, as reported by `docker-machine ip`.
    pub fn host_ip(&self) -> EngineResult<&str> {
        self.host_ip
            .get_or_try_init(|| Ok(self.machine_command(&["ip"])?.trim().to_string()))
            .map(String::as_str)
    }

    /// Variables exported by `docker-machine env`, e.g. `DOCKER_HOST`.
    pub fn extra_env(&self) -> EngineResult<&EnvSnapshot> {
        self.extra_env.get_or_try_init(|| {
            let script = self.machine_command(&["env", "--shell=sh/bash"])?;
            Ok(output::parse_export_script(&script))
        })
    }

    /// The base environment with [`Self::extra_env`] layered on top.
    pub fn merged_env(&self) -> EngineResult<&EnvSnapshot> {
        self.merged_env.get_or_try_init(|| {
            let extra = self.extra_env()?;
            Ok(self.settings.base_env.overlay(extra))
        })
    }

    /// Run `docker <args>` with live output, returning the captured stdout.
    pub fn run_engine(&self, args: &[String]) -> EngineResult<String> {
        self.run_engine_with(&self.loud, args)
    }

    /// Run `docker <args>` capturing stdout without echoing it.
    pub fn run_engine_silent(&self, args: &[String]) -> EngineResult<String> {
        self.run_engine_with(&self.silent, args)
    }

    /// Run `docker <args>` silently and parse its stdout as JSON.
    pub fn run_engine_json(&self, args: &[String]) -> EngineResult<InspectionNode> {
        let raw = self.run_engine_silent(args)?;
        output::parse_inspection(&self.engine_spec(args).display(), &raw)
    }

    fn run_engine_with(&self, runner: &R, args: &[String]) -> EngineResult<String> {
        self.ensure_started()?;
        let env = self.merged_env()?.clone();
        let spec = self.engine_spec(args).with_env(env);
        runner.run(&spec).map(|result| result.stdout)
    }

    fn engine_spec(&self, args: &[String]) -> CommandSpec {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.settings.engine_bin.clone());
        argv.extend(args.iter().cloned());
        CommandSpec::new(argv, &self.settings.work_dir)
    }

    fn machine_command(&self, args: &[&str]) -> EngineResult<String> {
        self.ensure_started()?;
        self.machine_command_unchecked(args)
    }

    /// `docker-machine <args> <machine>` without triggering the start check.
    fn machine_command_unchecked(&self, args: &[&str]) -> EngineResult<String> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push(self.settings.machine_bin.clone());
        argv.extend(args.iter().map(|a| a.to_string()));
        argv.push(self.settings.machine.clone());

        let spec = CommandSpec::new(argv, &self.settings.work_dir)
            .with_env(self.settings.base_env.clone());
        self.silent.run(&spec).map(|result| result.stdout)
    }
}
