//! Scripted command runner shared by the unit tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::docker::{
    CommandResult, CommandRunner, CommandSpec, EngineError, EngineHostSession, EngineResult,
    EnvSnapshot, SessionSettings,
};

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Exit(i32),
}

#[derive(Debug, Default)]
struct Script {
    replies: Vec<(Vec<String>, Reply)>,
    calls: Vec<CommandSpec>,
}

/// Answers commands by argv prefix and records every call.
///
/// The longest registered prefix wins; unmatched commands succeed with empty
/// output. Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, prefix: &[&str], reply: Reply) {
        let prefix = strings(prefix);
        let mut script = self.lock();
        script.replies.retain(|(p, _)| *p != prefix);
        script.replies.push((prefix, reply));
    }

    /// Reply with `stdout` to commands starting with `prefix`.
    pub fn respond(&self, prefix: &[&str], stdout: &str) {
        self.register(prefix, Reply::Output(stdout.to_string()));
    }

    /// Fail commands starting with `prefix` with exit `code`.
    pub fn fail(&self, prefix: &[&str], code: i32) {
        self.register(prefix, Reply::Exit(code));
    }

    /// Argv of every call so far, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.iter().map(|spec| spec.argv().to_vec()).collect()
    }

    /// Number of calls whose argv starts with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|argv| starts_with(argv, prefix))
            .count()
    }

    pub fn last_spec(&self) -> Option<CommandSpec> {
        self.lock().calls.last().cloned()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> EngineResult<CommandResult> {
        let mut script = self.lock();
        script.calls.push(spec.clone());

        let reply = script
            .replies
            .iter()
            .filter(|(prefix, _)| {
                let prefix: Vec<&str> = prefix.iter().map(String::as_str).collect();
                starts_with(spec.argv(), &prefix)
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Exit(code)) => Err(EngineError::process_failure(
                spec.display(),
                Some(code),
                String::new(),
            )),
            Some(Reply::Output(stdout)) => Ok(CommandResult {
                stdout,
                stderr: String::new(),
                exit_code: Some(0),
            }),
            None => Ok(CommandResult {
                exit_code: Some(0),
                ..CommandResult::default()
            }),
        }
    }
}

fn starts_with(argv: &[String], prefix: &[&str]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Session for machine `default` in `/work`, using `runner` for both output modes.
pub fn session_with(runner: &ScriptedRunner) -> EngineHostSession<ScriptedRunner> {
    let base: EnvSnapshot = [("PATH", "/usr/bin:/bin")].into_iter().collect();
    EngineHostSession::new(
        SessionSettings::new("default", "/work", base),
        runner.clone(),
        runner.clone(),
    )
}
