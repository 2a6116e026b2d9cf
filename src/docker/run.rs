use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::types::{CancelToken, CommandResult, CommandSpec};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const CHUNK_SIZE: usize = 16 * 1024;

/// Abstraction over command execution so sessions can be driven by fakes.
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion.
    ///
    /// A non-zero exit is reported as [`EngineError::ProcessFailure`].
    fn run(&self, spec: &CommandSpec) -> EngineResult<CommandResult>;
}

/// Runs real child processes, draining both output pipes on their own threads.
///
/// Stdout is always captured. With `mirror` set, stdout and stderr are also
/// copied to this process's own streams as they arrive; otherwise only the
/// captured copies exist.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    mirror: bool,
    cancel: CancelToken,
}

impl ProcessRunner {
    pub fn new(mirror: bool, cancel: CancelToken) -> Self {
        Self { mirror, cancel }
    }

    /// Runner that echoes child output live.
    pub fn mirroring(cancel: CancelToken) -> Self {
        Self::new(true, cancel)
    }

    /// Runner that only captures.
    pub fn silent(cancel: CancelToken) -> Self {
        Self::new(false, cancel)
    }

    pub fn mirrors(&self) -> bool {
        self.mirror
    }

    fn echo_for(&self, stream: Echo) -> Echo {
        if self.mirror { stream } else { Echo::Discard }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> EngineResult<CommandResult> {
        let command = spec.display();
        if self.cancel.is_cancelled() {
            return Err(EngineError::InterruptedWait { command });
        }

        debug!(command = %command, dir = %spec.work_dir().display(), "running");

        let mut builder = Command::new(spec.program());
        builder
            .args(spec.args())
            .current_dir(spec.work_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(env) = spec.env() {
            builder.env_clear().envs(env.iter());
        }

        let mut child = builder.spawn().map_err(|source| EngineError::Spawn {
            command: command.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Spawn {
                command,
                source: io::Error::other("child output pipes were not captured"),
            });
        };

        // --- drain threads ------------------------------------------------
        let stdout_handle = spawn_drain(stdout, self.echo_for(Echo::Stdout));
        let stderr_handle = spawn_drain(stderr, self.echo_for(Echo::Stderr));

        // --- wait loop ------------------------------------------------------
        let waited = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break Err(EngineError::Wait {
                        command: command.clone(),
                        source,
                    });
                }
            }

            if self.cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                break Err(EngineError::InterruptedWait {
                    command: command.clone(),
                });
            }

            thread::sleep(POLL_INTERVAL);
        };

        // --- finalize -------------------------------------------------------
        // Grandchildren of a killed child can keep the pipes open; the drain
        // threads are detached instead of joined so the error returns now.
        let status = match waited {
            Ok(status) => status,
            Err(err) => {
                drop((stdout_handle, stderr_handle));
                return Err(err);
            }
        };
        let stdout = String::from_utf8_lossy(&join_drain(stdout_handle)).into_owned();
        let stderr = String::from_utf8_lossy(&join_drain(stderr_handle)).into_owned();

        if !status.success() {
            debug!(command = %command, status = ?status.code(), "command failed");
            return Err(EngineError::process_failure(command, status.code(), stderr));
        }

        Ok(CommandResult {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}

/// Where a drain thread copies the bytes it reads, besides its own buffer.
#[derive(Debug, Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
    Discard,
}

impl Echo {
    fn write(self, chunk: &[u8]) {
        // Mirror failures (closed terminal, broken pipe) never fail the command.
        match self {
            Echo::Stdout => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(chunk);
                let _ = out.flush();
            }
            Echo::Stderr => {
                let mut err = io::stderr().lock();
                let _ = err.write_all(chunk);
                let _ = err.flush();
            }
            Echo::Discard => {}
        }
    }
}

fn spawn_drain<R>(mut source: R, echo: Echo) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut captured = Vec::with_capacity(4 * 1024);
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = &buf[..n];
                    captured.extend_from_slice(chunk);
                    echo.write(chunk);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!(error = %e, "output pipe closed with error");
                    break;
                }
            }
        }
        captured
    })
}

fn join_drain(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}
