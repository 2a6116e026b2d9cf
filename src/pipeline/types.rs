use std::fmt;
use std::path::PathBuf;

use crate::docker::EngineError;

/// Steps of a deployment, in the order `deploy` runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Teardown,
    RemoveImage,
    Build,
    Run,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::Teardown => "teardown",
            DeployStep::RemoveImage => "remove-image",
            DeployStep::Build => "build",
            DeployStep::Run => "run",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Containers touched by a teardown sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownSummary {
    pub stopped: Vec<String>,
    pub removed: Vec<String>,
}

/// What a full deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub teardown: TeardownSummary,
    pub image_removed: bool,
    pub container_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("package directory {} does not exist; run the packaging step first", .0.display())]
    MissingPackageDir(PathBuf),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DeployError {
    /// The underlying engine failure, if there is one.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            DeployError::Engine(err) => Some(err),
            DeployError::MissingPackageDir(_) => None,
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
