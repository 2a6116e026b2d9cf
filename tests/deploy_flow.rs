//! End-to-end deploy against fake `docker` and `docker-machine` scripts.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use dockhand::config::{ContainerLink, DeployConfig, HostEntry, ImageConfig};
use dockhand::docker::{CancelToken, EngineHostSession, EnvSnapshot, SessionSettings};
use dockhand::pipeline::{DeployError, DeploymentPlanner};

const FAKE_MACHINE: &str = r#"#!/bin/sh
echo "docker-machine $*" >> "__LOG__"
case "$1" in
  status) echo "__STATUS__" ;;
  start) ;;
  ip) echo "192.168.99.100" ;;
  env)
    echo 'export DOCKER_HOST="tcp://192.168.99.100:2376"'
    echo 'export DOCKER_CERT_PATH="/certs"'
    echo '# Run this command to configure your shell:'
    ;;
esac
"#;

const FAKE_ENGINE: &str = r#"#!/bin/sh
echo "docker $* @ $DOCKER_HOST" >> "__LOG__"
case "$1" in
  ps) printf 'c1\nc2\n' ;;
  inspect)
    case "$2" in
      c1) echo '[{"Id":"c1","Config":{"Image":"grp/app:1"}}]' ;;
      *) echo '[{"Id":"c2","Config":{"Image":"other/app:1"}}]' ;;
    esac
    ;;
  rmi) echo "conflict: image is in use" >&2; exit 1 ;;
  build) echo "Successfully built 0123abcd" ;;
  run) echo "abc123def456" ;;
esac
"#;

struct Fixture {
    dir: tempfile::TempDir,
    log: PathBuf,
}

impl Fixture {
    fn new(machine_status: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        let log_str = log.to_string_lossy().into_owned();

        write_script(
            &dir.path().join("docker-machine"),
            &FAKE_MACHINE.replace("__LOG__", &log_str).replace("__STATUS__", machine_status),
        );
        write_script(&dir.path().join("docker"), &FAKE_ENGINE.replace("__LOG__", &log_str));

        Self { dir, log }
    }

    fn project_dir(&self) -> &Path {
        self.dir.path()
    }

    fn session(&self) -> EngineHostSession {
        let base: EnvSnapshot = [("PATH", "/usr/bin:/bin")].into_iter().collect();
        let mut settings = SessionSettings::new("dev", self.project_dir(), base);
        settings.engine_bin = self.dir.path().join("docker").to_string_lossy().into_owned();
        settings.machine_bin = self.dir.path().join("docker-machine").to_string_lossy().into_owned();
        EngineHostSession::with_process_runners(settings, CancelToken::new())
    }

    /// Write a `.dockhand.yml` pointing at the fake binaries.
    fn write_config(&self) {
        let yaml = format!(
            "project: myzoodata\nimage:\n  group: grp\n  name: app\n  version: \"2\"\nengine_bin: '{}'\nmachine_bin: '{}'\n",
            self.dir.path().join("docker").display(),
            self.dir.path().join("docker-machine").display(),
        );
        fs::write(self.project_dir().join(".dockhand.yml"), yaml).expect("write config");
    }

    /// Run the `dockhand` binary against this project.
    fn dockhand(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dockhand"))
            .arg("-C")
            .arg(self.project_dir())
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("DOCKHAND_MACHINE")
            .env_remove("DOCKHAND_NETWORK")
            .output()
            .expect("run dockhand")
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn config() -> DeployConfig {
    DeployConfig {
        project: "myzoodata".into(),
        image: ImageConfig {
            group: "grp".into(),
            name: Some("app".into()),
            version: Some("2".into()),
        },
        host_entries: vec![HostEntry::new("db", "10.0.0.5")],
        links: vec![ContainerLink::new("cache", "redis")],
        ..DeployConfig::default()
    }
}

#[test]
fn deploy_replaces_the_running_container() {
    let fixture = Fixture::new("Stopped");
    fs::create_dir_all(fixture.project_dir().join("build/docker-pkg")).unwrap();
    let package_dir = fixture.project_dir().join("build/docker-pkg");
    let session = fixture.session();
    let cfg = config();

    let report = DeploymentPlanner::new(&session, &cfg).deploy().unwrap();

    assert_eq!(report.container_id, "abc123def456");
    assert_eq!(report.teardown.stopped, vec!["c1".to_string()]);
    assert_eq!(report.teardown.removed, vec!["c1".to_string()]);
    assert!(!report.image_removed);

    let host = "@ tcp://192.168.99.100:2376";
    let expected = vec![
        "docker-machine status dev".to_string(),
        "docker-machine start dev".to_string(),
        "docker-machine env --shell=sh/bash dev".to_string(),
        format!("docker ps -q --no-trunc=true {host}"),
        format!("docker inspect c1 {host}"),
        format!("docker inspect c2 {host}"),
        format!("docker stop c1 {host}"),
        format!("docker wait c1 {host}"),
        format!("docker ps -q --no-trunc=true -a {host}"),
        format!("docker inspect c1 {host}"),
        format!("docker inspect c2 {host}"),
        format!("docker rm c1 {host}"),
        format!("docker rmi grp/app:2 {host}"),
        format!("docker build -t grp/app:2 {} {host}", package_dir.display()),
        format!(
            "docker run -d --name myzoodata -p 9005:9005 --add-host db:10.0.0.5 --link cache:redis grp/app:2 {host}"
        ),
    ];
    assert_eq!(fixture.calls(), expected);
}

#[test]
fn build_without_package_dir_stops_the_deploy() {
    let fixture = Fixture::new("Running");
    let session = fixture.session();
    let cfg = config();

    let err = DeploymentPlanner::new(&session, &cfg).deploy().unwrap_err();

    assert!(matches!(err, DeployError::MissingPackageDir(_)));
    let calls = fixture.calls();
    assert!(!calls.iter().any(|c| c.starts_with("docker-machine start")));
    assert!(!calls.iter().any(|c| c.starts_with("docker build")));
    assert!(!calls.iter().any(|c| c.starts_with("docker run")));
}

#[test]
fn session_exposes_machine_ip_and_env() {
    let fixture = Fixture::new("Running");
    let session = fixture.session();

    assert_eq!(session.host_ip().unwrap(), "192.168.99.100");
    let env = session.extra_env().unwrap();
    assert_eq!(env.get("DOCKER_HOST"), Some("tcp://192.168.99.100:2376"));
    assert_eq!(env.get("DOCKER_CERT_PATH"), Some("/certs"));
    assert_eq!(env.len(), 2);

    let merged = session.merged_env().unwrap();
    assert_eq!(merged.get("PATH"), Some("/usr/bin:/bin"));
    assert_eq!(merged.get("DOCKER_HOST"), Some("tcp://192.168.99.100:2376"));
}

#[test]
fn run_prints_the_container_id_once() {
    let fixture = Fixture::new("Running");
    fixture.write_config();

    let output = fixture.dockhand(&["run"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "abc123def456\n");
}

#[test]
fn deploy_ends_stdout_with_the_container_id() {
    let fixture = Fixture::new("Running");
    fixture.write_config();
    fs::create_dir_all(fixture.project_dir().join("build/docker-pkg")).unwrap();

    let output = fixture.dockhand(&["deploy"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.last(), Some(&"abc123def456"));
    assert_eq!(lines.iter().filter(|l| **l == "abc123def456").count(), 1);
    // Build output is mirrored; the rmi refusal goes to stderr.
    assert!(lines.contains(&"Successfully built 0123abcd"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("image is in use"));
}
