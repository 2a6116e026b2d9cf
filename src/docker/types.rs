use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation token backed by an `AtomicBool`.
///
/// Once cancelled a token stays cancelled; runners never reset it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Immutable mapping of environment variable names to values.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot(Arc<BTreeMap<String, String>>);

impl EnvSnapshot {
    /// Capture the current process environment, skipping non-UTF-8 entries.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a new snapshot with `other`'s entries layered on top of `self`.
    pub fn overlay(&self, other: &EnvSnapshot) -> EnvSnapshot {
        let mut merged = (*self.0).clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        EnvSnapshot(Arc::new(merged))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(Arc::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }
}

/// A fully described external command: argv, environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    env: Option<EnvSnapshot>,
    work_dir: PathBuf,
}

impl CommandSpec {
    /// `argv[0]` is the program. Inherits the process environment until
    /// [`CommandSpec::with_env`] is applied.
    pub fn new(argv: Vec<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            env: None,
            work_dir: work_dir.into(),
        }
    }

    /// Run the child with exactly `env` instead of the inherited environment.
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn env(&self) -> Option<&EnvSnapshot> {
        self.env.as_ref()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Shell-quoted rendering of the argv for logs and error messages.
    pub fn display(&self) -> String {
        shell_words::join(&self.argv)
    }
}

/// Outcome of a successful command run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}
