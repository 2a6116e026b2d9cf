// Engine plumbing: child processes, the machine session and container queries.

pub mod engine;
pub mod error;
pub mod query;
pub mod run;
pub mod types;

pub use engine::{EngineHostSession, SessionSettings};
pub use error::{EngineError, EngineResult};
pub use query::{ContainerQuery, image_prefix_filter};
pub use run::{CommandRunner, ProcessRunner};
pub use types::{CancelToken, CommandResult, CommandSpec, EnvSnapshot};
