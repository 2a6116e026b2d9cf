use std::io;

/// Failures raised while running engine or machine commands.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with status {status_text}")]
    ProcessFailure {
        command: String,
        exit_code: Option<i32>,
        status_text: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {reason}")]
    MalformedOutput { command: String, reason: String },

    #[error("wait for `{command}` was interrupted")]
    InterruptedWait { command: String },

    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub(crate) fn process_failure(command: String, exit_code: Option<i32>, stderr: String) -> Self {
        let status_text = exit_code.map_or_else(|| String::from("unknown (signal)"), |c| c.to_string());
        Self::ProcessFailure {
            command,
            exit_code,
            status_text,
            stderr,
        }
    }

    pub(crate) fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Exit code carried by a [`EngineError::ProcessFailure`].
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessFailure { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    pub fn is_process_failure(&self) -> bool {
        matches!(self, Self::ProcessFailure { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
